use std::{collections::BTreeSet, fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    merchant: String,
    category: String,
    job: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, ValueEnum)]
pub enum OptionList {
    Merchants,
    Categories,
    Jobs,
    States,
}

/// Sorted distinct values offered as choices for manual entry. Not used when
/// scoring.
#[derive(Debug, Default, Clone)]
pub struct ReferenceOptions {
    merchants: Vec<String>,
    categories: Vec<String>,
    jobs: Vec<String>,
    states: Vec<String>,
}

impl ReferenceOptions {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open reference dataset '{}'", path.display()))?;
        let options = Self::from_reader(file)
            .with_context(|| format!("failed to read reference dataset '{}'", path.display()))?;

        info!(
            path = %path.display(),
            merchants = options.merchants.len(),
            categories = options.categories.len(),
            jobs = options.jobs.len(),
            states = options.states.len(),
            "Reference options loaded"
        );
        Ok(options)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut dataset_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut merchants = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut jobs = BTreeSet::new();
        let mut states = BTreeSet::new();
        for row in dataset_reader.deserialize::<ReferenceRow>() {
            let row = row?;
            merchants.insert(row.merchant);
            categories.insert(row.category);
            jobs.insert(row.job);
            if let Some(state) = row.state {
                states.insert(state);
            }
        }

        Ok(Self {
            merchants: merchants.into_iter().collect(),
            categories: categories.into_iter().collect(),
            jobs: jobs.into_iter().collect(),
            states: states.into_iter().collect(),
        })
    }

    pub fn list(&self, list: OptionList) -> &[String] {
        match list {
            OptionList::Merchants => &self.merchants,
            OptionList::Categories => &self.categories,
            OptionList::Jobs => &self.jobs,
            OptionList::States => &self.states,
        }
    }
}
