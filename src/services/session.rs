use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;

use crate::data_structures::{Gender, Interaction, TransactionRecord, utils::serde::money};

/// Manual-entry form, starting from the same defaults a fresh form shows.
#[derive(Debug, Clone, PartialEq)]
pub struct FormInput {
    pub merchant: String,
    pub category: String,
    pub job: String,
    pub state: String,
    pub amount: Decimal,
    pub age: f64,
    pub gender: Gender,
    pub city_pop: f64,
    pub lat: f64,
    pub long: f64,
    pub merch_lat: f64,
    pub merch_long: f64,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
}

impl Default for FormInput {
    fn default() -> Self {
        Self {
            merchant: String::new(),
            category: String::new(),
            job: String::new(),
            state: String::new(),
            amount: Decimal::ZERO,
            age: 0.0,
            gender: Gender::Male,
            city_pop: 0.0,
            lat: 0.0,
            long: 0.0,
            merch_lat: 0.0,
            merch_long: 0.0,
            hour: 12,
            day: 15,
            month: 6,
        }
    }
}

impl FormInput {
    pub const FIELDS: [&'static str; 15] = [
        "merchant",
        "category",
        "job",
        "state",
        "amt",
        "age",
        "gender",
        "city_pop",
        "lat",
        "long",
        "merch_lat",
        "merch_long",
        "hour",
        "day",
        "month",
    ];

    /// Updates one field from text. Unknown fields and unparsable values are
    /// rejected and leave the form unchanged.
    pub fn set(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let number = || -> Result<f64> {
            value
                .parse::<f64>()
                .with_context(|| format!("'{value}' is not a number for {field}"))
        };
        let small = || -> Result<u8> {
            value
                .parse::<u8>()
                .with_context(|| format!("'{value}' is not a whole number for {field}"))
        };

        match field {
            "merchant" => self.merchant = value.to_string(),
            "category" => self.category = value.to_string(),
            "job" => self.job = value.to_string(),
            "state" => self.state = value.to_uppercase(),
            "amt" | "amount" => self.amount = money::parse(value).map_err(anyhow::Error::msg)?,
            "age" => self.age = number()?,
            "gender" => self.gender = value.parse().map_err(anyhow::Error::msg)?,
            "city_pop" => self.city_pop = number()?,
            "lat" => self.lat = number()?,
            "long" => self.long = number()?,
            "merch_lat" => self.merch_lat = number()?,
            "merch_long" => self.merch_long = number()?,
            "hour" => self.hour = small()?,
            "day" => self.day = small()?,
            "month" => self.month = small()?,
            other => bail!(
                "unknown field '{other}', expected one of: {}",
                Self::FIELDS.join(", ")
            ),
        }
        Ok(())
    }

    pub fn values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("merchant", self.merchant.clone()),
            ("category", self.category.clone()),
            ("job", self.job.clone()),
            ("state", self.state.clone()),
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

    /// Builds the record to score. Required-field checks are left to the
    /// predictor; this only rejects values outside their valid range.
    pub fn to_record(&self) -> Result<TransactionRecord> {
        let state = self.state.trim();
        let record = TransactionRecord {
            merchant: self.merchant.trim().to_string(),
            category: self.category.trim().to_string(),
            amount: self.amount,
            job: self.job.trim().to_string(),
            age: self.age,
            hour: self.hour,
            day: self.day,
            month: self.month,
            gender: self.gender,
            state: (!state.is_empty()).then(|| state.to_string()),
            city_pop: self.city_pop,
            lat: self.lat,
            long: self.long,
            merch_lat: self.merch_lat,
            merch_long: self.merch_long,
        };
        record.check_ranges()?;

        Ok(record)
    }
}

/// Per-user state between actions: the form and the last successful result.
#[derive(Debug, Default)]
pub struct Session {
    pub form: FormInput,
    last: Option<Interaction>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Interaction> {
        self.last.as_ref()
    }

    /// Stores a successful outcome in place of the previous one. A failed
    /// outcome is handed back and the session keeps what it had.
    pub fn apply<E>(&mut self, outcome: Result<Interaction, E>) -> Result<&Interaction, E> {
        let interaction = outcome?;
        Ok(self.last.insert(interaction))
    }

    pub fn reset(&mut self) {
        self.form = FormInput::default();
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{
        InteractionKind, Prediction, sample_record,
    };
    use crate::services::encoder::tests::encoder;

    fn interaction(kind: InteractionKind, probability: f64) -> Interaction {
        let record = sample_record();
        Interaction {
            kind,
            encoded: encoder().encode(&record),
            record,
            prediction: Prediction::from_probability(probability),
        }
    }

    #[test]
    fn test_form_defaults() {
        let form = FormInput::default();

        assert_eq!((form.hour, form.day, form.month), (12, 15, 6));
        assert_eq!(form.gender, Gender::Male);
        assert!(form.merchant.is_empty());
        assert_eq!(form.amount, Decimal::ZERO);
    }

    #[test]
    fn test_form_set_and_build() {
        let mut form = FormInput::default();
        form.set("merchant", " fraud_Koepp-Parker ").unwrap();
        form.set("category", "shopping_net").unwrap();
        form.set("amt", "500").unwrap();
        form.set("state", "ca").unwrap();
        form.set("gender", "F").unwrap();
        form.set("hour", "22").unwrap();

        let record = form.to_record().unwrap();
        assert_eq!(record.merchant, "fraud_Koepp-Parker");
        assert_eq!(record.amount, Decimal::from(500));
        assert_eq!(record.state.as_deref(), Some("CA"));
        assert_eq!(record.gender, Gender::Female);
        assert_eq!(record.hour, 22);
    }

    #[test]
    fn test_form_rejects_bad_values() {
        let mut form = FormInput::default();

        assert!(form.set("age", "old").is_err());
        assert!(form.set("amt", "-3").is_err());
        assert!(form.set("colour", "red").is_err());
        assert_eq!(form, FormInput::default());

        form.set("hour", "30").unwrap();
        assert!(form.to_record().is_err());
    }

    #[test]
    fn test_empty_state_becomes_none() {
        let record = FormInput::default().to_record().unwrap();
        assert_eq!(record.state, None);
    }

    #[test]
    fn test_apply_overwrites_wholesale() {
        let mut session = Session::new();
        session
            .apply::<()>(Ok(interaction(InteractionKind::Manual, 0.2)))
            .unwrap();
        session
            .apply::<()>(Ok(interaction(InteractionKind::FraudSample, 0.9)))
            .unwrap();

        let last = session.last().unwrap();
        assert_eq!(last.kind, InteractionKind::FraudSample);
        assert_eq!(last.prediction.probability, 0.9);
    }

    #[test]
    fn test_failed_action_keeps_previous_result() {
        let mut session = Session::new();
        session
            .apply::<&str>(Ok(interaction(InteractionKind::LegitSample, 0.1)))
            .unwrap();

        assert!(session.apply(Err("missing input")).is_err());
        assert_eq!(session.last().unwrap().kind, InteractionKind::LegitSample);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = Session::new();
        session.form.set("merchant", "fraud_Towne-Koepp").unwrap();
        session
            .apply::<()>(Ok(interaction(InteractionKind::Manual, 0.6)))
            .unwrap();

        session.reset();
        assert!(session.last().is_none());
        assert_eq!(session.form, FormInput::default());
    }
}
