use std::io::{BufRead, Write};

use anyhow::Result;
use clap::ValueEnum;
use rand::Rng;

use super::render;
use crate::{
    data_structures::{InteractionKind, PoolKind, TransactionRecord},
    services::{Classifier, OptionList, Predictor, ReferenceOptions, SampleProvider, Session},
};

const HELP: &str = "\
Commands:
  set <field>=<value>   fill in a form field (see `form` for the field names)
  form                  show the current form
  check                 score the form
  fraud | legit         score a random fraud / legitimate sample
  show                  show the last result
  options <list>        list merchants, categories, jobs or states
  reset                 clear the form and the last result
  help                  show this message
  quit                  leave";

enum Flow {
    Continue,
    Quit,
}

/// Line-driven stand-in for the demo form: one command per line, one
/// classify-and-render cycle per action.
pub struct Prompt<'a, C> {
    predictor: &'a Predictor<C>,
    samples: &'a SampleProvider,
    options: Option<&'a ReferenceOptions>,
    json: bool,
    session: Session,
}

impl<'a, C: Classifier> Prompt<'a, C> {
    pub fn new(
        predictor: &'a Predictor<C>,
        samples: &'a SampleProvider,
        options: Option<&'a ReferenceOptions>,
        json: bool,
    ) -> Self {
        Self {
            predictor,
            samples,
            options,
            json,
            session: Session::new(),
        }
    }

    pub fn run<R: BufRead, W: Write, G: Rng>(&mut self, mut input: R, out: &mut W, rng: &mut G) -> Result<()> {
        writeln!(out, "{HELP}")?;
        let mut line = String::new();
        loop {
            write!(out, "> ")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            if let Flow::Quit = self.handle(line.trim(), out, rng)? {
                break;
            }
        }
        Ok(())
    }

    fn handle<W: Write, G: Rng>(&mut self, line: &str, out: &mut W, rng: &mut G) -> Result<Flow> {
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "help" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => return Ok(Flow::Quit),
            "set" => {
                let pair = rest
                    .split_once('=')
                    .or_else(|| rest.split_once(char::is_whitespace));
                match pair {
                    Some((field, value)) => {
                        if let Err(err) = self.session.form.set(field.trim(), value) {
                            writeln!(out, "error: {err:#}")?;
                        }
                    }
                    None => writeln!(out, "usage: set <field>=<value>")?,
                }
            }
            "form" => render::write_form(out, &self.session.form)?,
            "check" => match self.session.form.to_record() {
                Ok(record) => self.act(InteractionKind::Manual, record, out)?,
                Err(err) => writeln!(out, "error: {err:#}")?,
            },
            "fraud" | "legit" => {
                let kind = if command == "fraud" {
                    PoolKind::Fraud
                } else {
                    PoolKind::Legit
                };
                let record = self.samples.sample_with(kind, rng);
                self.act(kind.into(), record, out)?;
            }
            "show" => match self.session.last() {
                Some(interaction) => {
                    let decoded = self.predictor.decode(&interaction.encoded);
                    if self.json {
                        render::write_interaction_json(out, interaction, &decoded)?;
                    } else {
                        render::write_interaction(out, interaction, &decoded, self.predictor.feature_importances())?;
                    }
                }
                None => writeln!(out, "No result yet.")?,
            },
            "options" => match (self.options, OptionList::from_str(rest, true)) {
                (Some(options), Ok(list)) => render::write_options(out, options.list(list))?,
                (None, _) => writeln!(out, "error: reference dataset is not loaded")?,
                (_, Err(_)) => writeln!(out, "usage: options <merchants|categories|jobs|states>")?,
            },
            "reset" => {
                self.session.reset();
                writeln!(out, "Cleared.")?;
            }
            other => writeln!(out, "unknown command '{other}', type `help`")?,
        }
        Ok(Flow::Continue)
    }

    fn act<W: Write>(&mut self, kind: InteractionKind, record: TransactionRecord, out: &mut W) -> Result<()> {
        let outcome = self.predictor.assess(kind, record);
        match self.session.apply(outcome) {
            Ok(interaction) => {
                let decoded = self.predictor.decode(&interaction.encoded);
                if self.json {
                    render::write_interaction_json(out, interaction, &decoded)?;
                } else {
                    render::write_interaction(out, interaction, &decoded, self.predictor.feature_importances())?;
                }
            }
            Err(err) if err.is_missing_input() => writeln!(out, "notice: {err}")?,
            Err(err) => writeln!(out, "error: {:#}", anyhow::Error::from(err))?,
        }
        Ok(())
    }
}
