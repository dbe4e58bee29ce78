use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use fraudscope::{
    config::{AppConfig, LoggingConfig},
    data_structures::{Gender, Interaction, InteractionKind, PoolKind, utils::serde::money},
    error::ClassifyError,
    presentation::{Prompt, render},
    services::{
        Classifier, FeatureEncoder, FeatureImportances, FormInput, OnnxClassifier, OptionList,
        Predictor, ReferenceOptions, SampleProvider,
    },
};

#[derive(Debug, Parser)]
#[command(name = "fraudscope", about = "Score card transactions with a pre-trained fraud model")]
struct Args {
    #[arg(
        help = "Path to a TOML configuration file",
        short = 'c',
        long = "config",
        global = true
    )]
    pub config: Option<PathBuf>,
    #[arg(
        help = "Print results as JSON",
        long = "json",
        global = true,
        default_value = "false"
    )]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score a transaction entered on the command line
    Predict(ManualArgs),
    /// Score a random example from the fraud or legitimate sample pool
    Sample {
        #[arg(help = "Which pool to draw from", value_enum)]
        kind: PoolKind,
    },
    /// List the values available for a form field
    Options {
        #[arg(help = "Which list to print", value_enum, default_value = "merchants")]
        list: OptionList,
    },
    /// Fill in the form and score transactions from a prompt
    Interactive,
}

#[derive(Debug, clap::Args)]
struct ManualArgs {
    #[arg(help = "Business name (e.g. fraud_Koepp-Parker)", long, default_value = "")]
    pub merchant: String,
    #[arg(
        help = "Transaction category (e.g. gas_transport, shopping_net, grocery_pos)",
        long,
        default_value = ""
    )]
    pub category: String,
    #[arg(help = "Occupation (e.g. Naval architect)", long, default_value = "")]
    pub job: String,
    #[arg(help = "2-letter state code (e.g. CA, NY, TX)", long, default_value = "")]
    pub state: String,
    #[arg(help = "Purchase amount in USD", long, default_value = "0", value_parser = money::parse)]
    pub amount: Decimal,
    #[arg(help = "Cardholder's age in years", long, default_value = "0")]
    pub age: f64,
    #[arg(help = "Cardholder's gender (Male or Female)", long, default_value = "Male")]
    pub gender: Gender,
    #[arg(help = "Population of the cardholder's city", long, default_value = "0")]
    pub city_pop: f64,
    #[arg(
        help = "Latitude where the transaction occurred",
        long,
        default_value = "0",
        allow_negative_numbers = true
    )]
    pub lat: f64,
    #[arg(
        help = "Longitude where the transaction occurred",
        long,
        default_value = "0",
        allow_negative_numbers = true
    )]
    pub long: f64,
    #[arg(
        help = "Latitude of the merchant's location",
        long,
        default_value = "0",
        allow_negative_numbers = true
    )]
    pub merch_lat: f64,
    #[arg(
        help = "Longitude of the merchant's location",
        long,
        default_value = "0",
        allow_negative_numbers = true
    )]
    pub merch_long: f64,
    #[arg(
        help = "Hour of day (0-23)",
        long,
        default_value = "12",
        value_parser = clap::value_parser!(u8).range(0..=23)
    )]
    pub hour: u8,
    #[arg(
        help = "Day of month (1-31)",
        long,
        default_value = "15",
        value_parser = clap::value_parser!(u8).range(1..=31)
    )]
    pub day: u8,
    #[arg(
        help = "Month of year (1-12)",
        long,
        default_value = "6",
        value_parser = clap::value_parser!(u8).range(1..=12)
    )]
    pub month: u8,
}

impl ManualArgs {
    fn into_form(self) -> FormInput {
        FormInput {
            merchant: self.merchant,
            category: self.category,
            job: self.job,
            state: self.state.to_uppercase(),
            amount: self.amount,
            age: self.age,
            gender: self.gender,
            city_pop: self.city_pop,
            lat: self.lat,
            long: self.long,
            merch_lat: self.merch_lat,
            merch_long: self.merch_long,
            hour: self.hour,
            day: self.day,
            month: self.month,
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn").add_directive(
            format!("fraudscope={}", logging.level)
                .parse()
                .context("invalid logging.level")?,
        ),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn load_predictor(config: &AppConfig) -> Result<Predictor<OnnxClassifier>> {
    let encoder = FeatureEncoder::load(&config.artifacts.encoders_path)?;
    let importances = config
        .artifacts
        .importances_path
        .as_ref()
        .map(FeatureImportances::load)
        .transpose()?;
    let classifier = OnnxClassifier::load(&config.artifacts.model_path, importances)?;

    Ok(Predictor::new(
        encoder,
        classifier,
        config.validation.require_state,
    ))
}

fn load_samples(config: &AppConfig) -> Result<SampleProvider> {
    SampleProvider::load(
        &config.artifacts.fraud_samples,
        &config.artifacts.legit_samples,
    )
}

/// Prints a finished interaction. Missing input is reported as a notice with
/// exit code 2; a classifier failure ends the command with an error.
fn report<C: Classifier, W: Write>(
    predictor: &Predictor<C>,
    outcome: Result<Interaction, ClassifyError>,
    json: bool,
    out: &mut W,
) -> Result<ExitCode> {
    match outcome {
        Ok(interaction) => {
            let decoded = predictor.decode(&interaction.encoded);
            if json {
                render::write_interaction_json(out, &interaction, &decoded)?;
            } else {
                render::write_interaction(
                    out,
                    &interaction,
                    &decoded,
                    predictor.feature_importances(),
                )?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_missing_input() => {
            eprintln!("notice: {err}");
            Ok(ExitCode::from(2))
        }
        Err(err) => Err(err.into()),
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())?;
    init_logging(&config.logging)?;

    let stdout = io::stdout();
    let mut stdout_writer = io::BufWriter::new(stdout.lock());

    let exit_code = match args.command {
        Command::Predict(manual) => {
            let predictor = load_predictor(&config)?;
            let record = manual.into_form().to_record()?;
            let outcome = predictor.assess(InteractionKind::Manual, record);
            report(&predictor, outcome, args.json, &mut stdout_writer)?
        }
        Command::Sample { kind } => {
            let predictor = load_predictor(&config)?;
            let samples = load_samples(&config)?;
            let outcome = predictor.assess(kind.into(), samples.sample(kind));
            report(&predictor, outcome, args.json, &mut stdout_writer)?
        }
        Command::Options { list } => {
            let options = ReferenceOptions::load(&config.artifacts.reference_dataset)?;
            render::write_options(&mut stdout_writer, options.list(list))?;
            ExitCode::SUCCESS
        }
        Command::Interactive => {
            let predictor = load_predictor(&config)?;
            let samples = load_samples(&config)?;
            let options = match ReferenceOptions::load(&config.artifacts.reference_dataset) {
                Ok(options) => Some(options),
                Err(err) => {
                    warn!(error = %err, "Reference dataset unavailable, `options` is disabled");
                    None
                }
            };

            let mut prompt = Prompt::new(&predictor, &samples, options.as_ref(), args.json);
            prompt.run(
                io::stdin().lock(),
                &mut stdout_writer,
                &mut rand::thread_rng(),
            )?;
            ExitCode::SUCCESS
        }
    };

    stdout_writer.flush().context("flush output")?;
    Ok(exit_code)
}
