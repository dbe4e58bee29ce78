pub mod classifier;
pub mod encoder;
pub mod predictor;
pub mod reference;
pub mod samples;
pub mod session;

pub use classifier::{Classifier, FeatureImportances, OnnxClassifier};
pub use encoder::FeatureEncoder;
pub use predictor::Predictor;
pub use reference::{OptionList, ReferenceOptions};
pub use samples::{SamplePool, SampleProvider};
pub use session::{FormInput, Session};
