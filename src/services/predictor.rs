use tracing::{debug, info};

use crate::{
    data_structures::{
        DecodedRecord, EncodedRecord, Interaction, InteractionKind, Prediction, TransactionRecord,
    },
    error::ClassifyError,
    services::{Classifier, FeatureEncoder, FeatureImportances},
};

/// Encodes a record, scores it and applies the decision threshold. Manual
/// input and sampled records go through the same path.
pub struct Predictor<C> {
    encoder: FeatureEncoder,
    classifier: C,
    require_state: bool,
}

impl<C: Classifier> Predictor<C> {
    pub fn new(encoder: FeatureEncoder, classifier: C, require_state: bool) -> Self {
        Self {
            encoder,
            classifier,
            require_state,
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn feature_importances(&self) -> Option<&FeatureImportances> {
        self.classifier.feature_importances()
    }

    /// Sample rows can't be corrected by the user, so only manual entry is
    /// held to the strict state rule.
    fn missing_fields(&self, kind: InteractionKind, record: &TransactionRecord) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if record.merchant.trim().is_empty() {
            missing.push("merchant");
        }
        if record.category.trim().is_empty() {
            missing.push("category");
        }
        let strict = self.require_state && kind == InteractionKind::Manual;
        if strict && record.state.as_deref().is_none_or(|s| s.trim().is_empty()) {
            missing.push("state");
        }
        missing
    }

    fn score(
        &self,
        kind: InteractionKind,
        record: &TransactionRecord,
    ) -> Result<(EncodedRecord, Prediction), ClassifyError> {
        let missing = self.missing_fields(kind, record);
        if !missing.is_empty() {
            return Err(ClassifyError::MissingRequiredInput(missing));
        }

        let encoded = self.encoder.encode(record);
        let probability = self
            .classifier
            .predict_probability(&encoded.features())
            .map_err(ClassifyError::Classifier)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ClassifyError::ProbabilityOutOfRange(probability));
        }

        let prediction = Prediction::from_probability(probability);
        debug!(
            merchant = %record.merchant,
            probability,
            label = ?prediction.label,
            "Transaction scored"
        );

        Ok((encoded, prediction))
    }

    /// Scores a manually entered record.
    pub fn classify(&self, record: &TransactionRecord) -> Result<Prediction, ClassifyError> {
        self.score(InteractionKind::Manual, record)
            .map(|(_, prediction)| prediction)
    }

    /// Scores `record` and packages everything the result view needs.
    pub fn assess(
        &self,
        kind: InteractionKind,
        record: TransactionRecord,
    ) -> Result<Interaction, ClassifyError> {
        let (encoded, prediction) = self.score(kind, &record)?;
        info!(
            kind = ?kind,
            probability = prediction.probability,
            label = ?prediction.label,
            "Prediction complete"
        );

        Ok(Interaction {
            kind,
            record,
            encoded,
            prediction,
        })
    }

    pub fn decode(&self, encoded: &EncodedRecord) -> DecodedRecord {
        self.encoder.decode(encoded)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::{Cell, RefCell};

    use anyhow::{Result, anyhow};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        data_structures::{FeatureVector, Label, PoolKind, SENTINEL, sample_record},
        services::{SamplePool, encoder::tests::encoder},
    };

    /// Returns a fixed probability and remembers what it was asked to score.
    pub(crate) struct MockClassifier {
        pub(crate) probability: f64,
        pub(crate) calls: Cell<usize>,
        pub(crate) last_features: RefCell<Option<FeatureVector>>,
    }

    impl MockClassifier {
        pub(crate) fn returning(probability: f64) -> Self {
            Self {
                probability,
                calls: Cell::new(0),
                last_features: RefCell::new(None),
            }
        }
    }

    impl Classifier for MockClassifier {
        fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
            self.calls.set(self.calls.get() + 1);
            *self.last_features.borrow_mut() = Some(*features);
            Ok(self.probability)
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict_probability(&self, _features: &FeatureVector) -> Result<f64> {
            Err(anyhow!("input has wrong shape"))
        }
    }

    #[test]
    fn test_fraud_scenario() {
        let predictor = Predictor::new(encoder(), MockClassifier::returning(0.87), true);

        let prediction = predictor.classify(&sample_record()).unwrap();
        assert_eq!(prediction.label, Label::Fraudulent);
        assert_eq!(prediction.probability, 0.87);
    }

    #[test]
    fn test_boundary_probability_is_fraudulent() {
        let predictor = Predictor::new(encoder(), MockClassifier::returning(0.5), true);

        let prediction = predictor.classify(&sample_record()).unwrap();
        assert_eq!(prediction.label, Label::Fraudulent);
        assert_eq!(prediction.label.caption(), "FRAUD RISK");
    }

    #[test]
    fn test_empty_merchant_skips_classifier() {
        let predictor = Predictor::new(encoder(), MockClassifier::returning(0.9), false);
        let mut record = sample_record();
        record.merchant = "  ".to_string();

        let err = predictor.classify(&record).unwrap_err();
        assert!(err.is_missing_input());
        assert!(matches!(err, ClassifyError::MissingRequiredInput(ref f) if f == &["merchant"]));
        assert_eq!(predictor.classifier.calls.get(), 0);
    }

    #[test]
    fn test_state_only_required_when_strict() {
        let mut record = sample_record();
        record.state = None;

        let lenient = Predictor::new(encoder(), MockClassifier::returning(0.2), false);
        assert_eq!(lenient.classify(&record).unwrap().label, Label::Legitimate);
        let features = lenient.classifier.last_features.borrow().unwrap();
        assert_eq!(features.0[9], SENTINEL as f32);

        let strict = Predictor::new(encoder(), MockClassifier::returning(0.2), true);
        let err = strict.classify(&record).unwrap_err();
        assert!(matches!(err, ClassifyError::MissingRequiredInput(ref f) if f == &["state"]));
        assert_eq!(strict.classifier.calls.get(), 0);
    }

    #[test]
    fn test_sample_without_state_scores_under_strict_config() {
        let csv = "\
merchant,category,amt,job,age,hour,day,month,gender,city_pop,lat,long,merch_lat,merch_long
fraud_Towne-Koepp,grocery_pos,312.50,Engineer,61,1,19,12,M,4200,31.9,-99.9,32.1,-99.5
";
        let pool = SamplePool::from_reader(PoolKind::Fraud, csv.as_bytes()).unwrap();
        let record = pool.sample_with(&mut StdRng::seed_from_u64(1)).clone();
        assert_eq!(record.state, None);

        let predictor = Predictor::new(encoder(), MockClassifier::returning(0.9), true);
        let interaction = predictor
            .assess(InteractionKind::FraudSample, record.clone())
            .unwrap();
        assert_eq!(interaction.prediction.label, Label::Fraudulent);
        assert_eq!(interaction.encoded.state, None);
        let features = predictor.classifier.last_features.borrow().unwrap();
        assert_eq!(features.0[9], SENTINEL as f32);

        let err = predictor.assess(InteractionKind::Manual, record).unwrap_err();
        assert!(matches!(err, ClassifyError::MissingRequiredInput(ref f) if f == &["state"]));
    }

    #[test]
    fn test_unseen_category_still_scores() {
        let predictor = Predictor::new(encoder(), MockClassifier::returning(0.3), true);
        let mut record = sample_record();
        record.category = "travel".to_string();

        let interaction = predictor.assess(InteractionKind::Manual, record).unwrap();
        assert_eq!(interaction.encoded.category, SENTINEL);
        let features = predictor.classifier.last_features.borrow().unwrap();
        assert_eq!(features.0[1], -1.0);
    }

    #[test]
    fn test_classifier_failure_propagates() {
        let predictor = Predictor::new(encoder(), FailingClassifier, true);

        let err = predictor.classify(&sample_record()).unwrap_err();
        assert!(matches!(err, ClassifyError::Classifier(_)));
        assert!(!err.is_missing_input());
    }

    #[test]
    fn test_out_of_range_probability_is_rejected() {
        for probability in [1.2, -0.1, f64::NAN] {
            let predictor = Predictor::new(encoder(), MockClassifier::returning(probability), true);
            let err = predictor.classify(&sample_record()).unwrap_err();
            assert!(matches!(err, ClassifyError::ProbabilityOutOfRange(_)));
        }
    }

    #[test]
    fn test_classify_is_deterministic() {
        let predictor = Predictor::new(encoder(), MockClassifier::returning(0.42), true);
        let record = sample_record();

        let first = predictor.classify(&record).unwrap();
        let second = predictor.classify(&record).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_assess_keeps_scored_record() {
        let predictor = Predictor::new(encoder(), MockClassifier::returning(0.87), true);

        let interaction = predictor
            .assess(InteractionKind::FraudSample, sample_record())
            .unwrap();
        assert_eq!(interaction.kind, InteractionKind::FraudSample);
        assert_eq!(interaction.record, sample_record());
        assert_eq!(
            predictor.decode(&interaction.encoded).merchant.to_string(),
            "fraud_Koepp-Parker"
        );
    }
}
