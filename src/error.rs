use thiserror::Error;

/// Ways a single classification request can end without a result.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("missing required input: {}", .0.join(", "))]
    MissingRequiredInput(Vec<&'static str>),

    #[error("classifier failed")]
    Classifier(#[source] anyhow::Error),

    #[error("classifier returned probability {0} outside [0, 1]")]
    ProbabilityOutOfRange(f64),
}

impl ClassifyError {
    /// User-correctable, as opposed to a failure of the model itself.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, ClassifyError::MissingRequiredInput(_))
    }
}
