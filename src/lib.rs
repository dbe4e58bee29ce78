//! Fraud scoring demo: encodes a card transaction with the label encodings the
//! model was trained with, scores it with a pre-trained classifier and renders
//! the verdict.

pub mod config;
pub mod data_structures;
pub mod error;
pub mod presentation;
pub mod services;

pub use crate::config::AppConfig;
pub use crate::error::ClassifyError;
pub use crate::services::{FeatureEncoder, Predictor, SampleProvider};
