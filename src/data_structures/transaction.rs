use std::{fmt, str::FromStr};

use anyhow::{Result, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum Gender {
    #[default]
    #[serde(alias = "M", alias = "male")]
    Male,
    #[serde(alias = "F", alias = "female")]
    Female,
}

impl Gender {
    /// The short form used by the reference dataset.
    pub fn code(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Ok(Gender::Male),
            "f" | "female" => Ok(Gender::Female),
            other => Err(format!("unknown gender '{other}', expected Male or Female")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fields that go through the label encoder before scoring.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum CategoricalField {
    Merchant,
    Category,
    Gender,
    Job,
    State,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 5] = [
        CategoricalField::Merchant,
        CategoricalField::Category,
        CategoricalField::Gender,
        CategoricalField::Job,
        CategoricalField::State,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CategoricalField::Merchant => "merchant",
            CategoricalField::Category => "category",
            CategoricalField::Gender => "gender",
            CategoricalField::Job => "job",
            CategoricalField::State => "state",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transaction as entered by hand or read from a sample file. Column names
/// follow the reference dataset; unknown columns are ignored when reading csv.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TransactionRecord {
    pub merchant: String,
    pub category: String,
    #[serde(rename = "amt", with = "super::utils::serde::money")]
    pub amount: Decimal,
    #[serde(default)]
    pub job: String,
    pub age: f64,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub gender: Gender,
    #[serde(default)]
    pub state: Option<String>,
    pub city_pop: f64,
    pub lat: f64,
    pub long: f64,
    pub merch_lat: f64,
    pub merch_long: f64,
}

impl TransactionRecord {
    /// Raw text of a categorical field, `None` when the optional state is absent.
    pub fn categorical(&self, field: CategoricalField) -> Option<&str> {
        match field {
            CategoricalField::Merchant => Some(&self.merchant),
            CategoricalField::Category => Some(&self.category),
            CategoricalField::Gender => Some(self.gender.code()),
            CategoricalField::Job => Some(&self.job),
            CategoricalField::State => self.state.as_deref(),
        }
    }

    pub fn check_ranges(&self) -> Result<()> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            bail!("amount must not be negative, got {}", self.amount);
        }
        if !(self.age >= 0.0) {
            bail!("age must not be negative, got {}", self.age);
        }
        if self.hour > 23 {
            bail!("hour must be within 0-23, got {}", self.hour);
        }
        if !(1..=31).contains(&self.day) {
            bail!("day must be within 1-31, got {}", self.day);
        }
        if !(1..=12).contains(&self.month) {
            bail!("month must be within 1-12, got {}", self.month);
        }
        if !(self.city_pop >= 0.0) {
            bail!("city population must not be negative, got {}", self.city_pop);
        }
        for (name, value) in [("lat", self.lat), ("merch_lat", self.merch_lat)] {
            if !(-90.0..=90.0).contains(&value) {
                bail!("{name} must be within -90..90 degrees, got {value}");
            }
        }
        for (name, value) in [("long", self.long), ("merch_long", self.merch_long)] {
            if !(-180.0..=180.0).contains(&value) {
                bail!("{name} must be within -180..180 degrees, got {value}");
            }
        }

        Ok(())
    }
}
