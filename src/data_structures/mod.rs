mod encoded;
mod prediction;
mod transaction;
pub mod utils;

pub use encoded::{DecodedRecord, DisplayValue, EncodedRecord, FeatureVector, FEATURE_COUNT, FEATURE_NAMES, SENTINEL};
pub use prediction::{DECISION_THRESHOLD, Interaction, InteractionKind, Label, PoolKind, Prediction};
pub use transaction::{CategoricalField, Gender, TransactionRecord};

#[cfg(test)]
pub(crate) use transaction::tests::sample_record;
