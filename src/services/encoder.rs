use std::{collections::HashMap, fs::File, io::Read, path::Path};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::data_structures::{
    CategoricalField, DecodedRecord, DisplayValue, EncodedRecord, SENTINEL, TransactionRecord,
};

/// Lookup for one categorical field. A class's code is its position in the
/// persisted class list.
#[derive(Debug, Clone)]
pub struct FieldEncoding {
    classes: Vec<String>,
    codes: HashMap<String, i64>,
}

impl FieldEncoding {
    pub fn from_classes(field: CategoricalField, classes: Vec<String>) -> Result<Self> {
        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), code as i64).is_some() {
                bail!("encoding for '{field}' lists '{class}' more than once");
            }
        }

        Ok(Self { classes, codes })
    }

    pub fn code(&self, value: &str) -> Option<i64> {
        self.codes.get(value).copied()
    }

    pub fn label(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Per-field label encodings, read once at startup and never modified.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    fields: [FieldEncoding; 5],
}

impl FeatureEncoder {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open encodings file '{}'", path.display()))?;
        let encoder = Self::from_reader(file)
            .with_context(|| format!("failed to read encodings from '{}'", path.display()))?;

        info!(
            path = %path.display(),
            merchants = encoder.field(CategoricalField::Merchant).classes().len(),
            categories = encoder.field(CategoricalField::Category).classes().len(),
            "Label encodings loaded"
        );

        Ok(encoder)
    }

    /// Reads `{"<field>": ["class0", "class1", ...]}`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut raw: HashMap<String, Vec<String>> =
            serde_json::from_reader(reader).context("encodings are not a field -> classes map")?;

        let mut fields = Vec::with_capacity(CategoricalField::ALL.len());
        for field in CategoricalField::ALL {
            let classes = raw
                .remove(field.as_str())
                .with_context(|| format!("no encoding for field '{field}'"))?;
            fields.push(FieldEncoding::from_classes(field, classes)?);
        }
        for extra in raw.keys() {
            debug!(field = %extra, "Ignoring encoding for a non-categorical field");
        }

        let fields = fields
            .try_into()
            .map_err(|_| anyhow::anyhow!("unexpected number of categorical fields"))?;
        Ok(Self { fields })
    }

    pub fn field(&self, field: CategoricalField) -> &FieldEncoding {
        &self.fields[field.index()]
    }

    /// Code for `value`, or [`SENTINEL`] when the encoder never saw it.
    pub fn encode_value(&self, field: CategoricalField, value: &str) -> i64 {
        match self.field(field).code(value) {
            Some(code) => code,
            None => {
                debug!(field = %field, value = %value, "Unseen category, using sentinel");
                SENTINEL
            }
        }
    }

    fn encode_gender(&self, record: &TransactionRecord) -> i64 {
        let encoding = self.field(CategoricalField::Gender);
        encoding
            .code(record.gender.code())
            .or_else(|| encoding.code(record.gender.name()))
            .unwrap_or_else(|| self.encode_value(CategoricalField::Gender, record.gender.code()))
    }

    pub fn encode(&self, record: &TransactionRecord) -> EncodedRecord {
        EncodedRecord {
            merchant: self.encode_value(CategoricalField::Merchant, &record.merchant),
            category: self.encode_value(CategoricalField::Category, &record.category),
            amount: record.amount,
            job: self.encode_value(CategoricalField::Job, &record.job),
            age: record.age,
            hour: record.hour,
            day: record.day,
            month: record.month,
            gender: self.encode_gender(record),
            state: record
                .state
                .as_deref()
                .map(|state| self.encode_value(CategoricalField::State, state)),
            city_pop: record.city_pop,
            lat: record.lat,
            long: record.long,
            merch_lat: record.merch_lat,
            merch_long: record.merch_long,
        }
    }

    fn decode_value(&self, field: CategoricalField, code: i64) -> DisplayValue {
        match self.field(field).label(code) {
            Some(label) => DisplayValue::Label(label.to_string()),
            None => DisplayValue::Code(code),
        }
    }

    /// Best-effort reverse lookup for display. Codes that don't index into a
    /// field's classes (the sentinel included) are kept as they are.
    pub fn decode(&self, encoded: &EncodedRecord) -> DecodedRecord {
        DecodedRecord {
            merchant: self.decode_value(CategoricalField::Merchant, encoded.merchant),
            category: self.decode_value(CategoricalField::Category, encoded.category),
            job: self.decode_value(CategoricalField::Job, encoded.job),
            state: encoded
                .state
                .map(|code| self.decode_value(CategoricalField::State, code)),
            amount: encoded.amount,
            age: encoded.age,
            gender: self.decode_value(CategoricalField::Gender, encoded.gender),
            city_pop: encoded.city_pop,
            lat: encoded.lat,
            long: encoded.long,
            merch_lat: encoded.merch_lat,
            merch_long: encoded.merch_long,
            hour: encoded.hour,
            day: encoded.day,
            month: encoded.month,
        }
    }
}
