use std::fmt;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;

/// Code assigned to a categorical value the encoder has never seen.
pub const SENTINEL: i64 = -1;

pub const FEATURE_COUNT: usize = 15;

/// Model input order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Merchant",
    "Category",
    "Amount",
    "Job",
    "Age",
    "Hour",
    "Day",
    "Month",
    "Gender",
    "State",
    "City Pop",
    "Trans Lat",
    "Trans Long",
    "Merch Lat",
    "Merch Long",
];

/// A transaction with every categorical field replaced by its integer code.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct EncodedRecord {
    pub merchant: i64,
    pub category: i64,
    #[serde(rename = "amt", with = "super::utils::serde::money")]
    pub amount: Decimal,
    pub job: i64,
    pub age: f64,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub gender: i64,
    pub state: Option<i64>,
    pub city_pop: f64,
    pub lat: f64,
    pub long: f64,
    pub merch_lat: f64,
    pub merch_long: f64,
}

impl EncodedRecord {
    pub fn features(&self) -> FeatureVector {
        FeatureVector([
            self.merchant as f32,
            self.category as f32,
            self.amount.to_f32().unwrap_or(f32::NAN),
            self.job as f32,
            self.age as f32,
            f32::from(self.hour),
            f32::from(self.day),
            f32::from(self.month),
            self.gender as f32,
            self.state.unwrap_or(SENTINEL) as f32,
            self.city_pop as f32,
            self.lat as f32,
            self.long as f32,
            self.merch_lat as f32,
            self.merch_long as f32,
        ])
    }
}

/// The fully numeric classifier input, ordered as [`FEATURE_NAMES`].
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct FeatureVector(pub [f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// A categorical value prepared for display: the recovered label when decoding
/// worked, otherwise the code exactly as it was scored.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum DisplayValue {
    Label(String),
    Code(i64),
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Label(label) => f.write_str(label),
            DisplayValue::Code(code) => write!(f, "{code}"),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct DecodedRecord {
    pub merchant: DisplayValue,
    pub category: DisplayValue,
    pub job: DisplayValue,
    pub state: Option<DisplayValue>,
    #[serde(rename = "amt", with = "super::utils::serde::money")]
    pub amount: Decimal,
    pub age: f64,
    pub gender: DisplayValue,
    pub city_pop: f64,
    pub lat: f64,
    pub long: f64,
    pub merch_lat: f64,
    pub merch_long: f64,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
}

impl DecodedRecord {
    /// Rows in display order, amount with 2 decimals.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("merchant", self.merchant.to_string()),
            ("category", self.category.to_string()),
            ("job", self.job.to_string()),
            (
                "state",
                self.state
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            ),
            ("amt", format!("{:.2}", self.amount)),
            ("age", self.age.to_string()),
            ("gender", self.gender.to_string()),
            ("city_pop", self.city_pop.to_string()),
            ("lat", self.lat.to_string()),
            ("long", self.long.to_string()),
            ("merch_lat", self.merch_lat.to_string()),
            ("merch_long", self.merch_long.to_string()),
            ("hour", self.hour.to_string()),
            ("day", self.day.to_string()),
            ("month", self.month.to_string()),
        ]
    }
}
