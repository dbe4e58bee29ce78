//! Layered configuration: built-in defaults, then an optional TOML file, then
//! `FRAUDSCOPE__*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "fraudscope";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

/// Files loaded once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// ONNX export of the trained classifier
    pub model_path: PathBuf,
    /// JSON map of field -> label-encoder classes
    pub encoders_path: PathBuf,
    /// JSON array of per-feature importances, if the model has them
    #[serde(default)]
    pub importances_path: Option<PathBuf>,
    pub fraud_samples: PathBuf,
    pub legit_samples: PathBuf,
    /// Full dataset, only read to list choices for manual entry
    pub reference_dataset: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Also require a state before scoring (merchant and category always are)
    pub require_state: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration, reading `path` if given (it must exist) or
    /// `fraudscope.toml` if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let builder = Self::defaults()?
            .add_source(file)
            .add_source(Environment::with_prefix("FRAUDSCOPE").separator("__"));

        Self::from_builder(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("artifacts.model_path", "fraud_detection_model.onnx")?
            .set_default("artifacts.encoders_path", "label_encoders.json")?
            .set_default("artifacts.fraud_samples", "fraud_samples.csv")?
            .set_default("artifacts.legit_samples", "legit_samples.csv")?
            .set_default("artifacts.reference_dataset", "credit_card_transactions.csv")?
            .set_default("validation.require_state", true)?
            .set_default("logging.level", "info")?;

        Ok(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactsConfig {
                model_path: "fraud_detection_model.onnx".into(),
                encoders_path: "label_encoders.json".into(),
                importances_path: None,
                fraud_samples: "fraud_samples.csv".into(),
                legit_samples: "legit_samples.csv".into(),
                reference_dataset: "credit_card_transactions.csv".into(),
            },
            validation: ValidationConfig {
                require_state: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    #[test]
    fn test_built_in_defaults_match_default_impl() {
        let loaded = AppConfig::from_builder(AppConfig::defaults().unwrap()).unwrap();
        let expected = AppConfig::default();

        assert_eq!(loaded.artifacts.model_path, expected.artifacts.model_path);
        assert_eq!(loaded.artifacts.encoders_path, expected.artifacts.encoders_path);
        assert_eq!(loaded.artifacts.importances_path, None);
        assert_eq!(loaded.artifacts.reference_dataset, expected.artifacts.reference_dataset);
        assert!(loaded.validation.require_state);
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn test_toml_overrides() {
        let toml = r#"
            [artifacts]
            model_path = "models/xgb.onnx"
            importances_path = "models/importances.json"

            [validation]
            require_state = false
        "#;
        let builder = AppConfig::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml));
        let config = AppConfig::from_builder(builder).unwrap();

        assert_eq!(config.artifacts.model_path, PathBuf::from("models/xgb.onnx"));
        assert_eq!(
            config.artifacts.importances_path,
            Some(PathBuf::from("models/importances.json"))
        );
        assert_eq!(config.artifacts.fraud_samples, PathBuf::from("fraud_samples.csv"));
        assert!(!config.validation.require_state);
    }

    #[test]
    fn test_environment_overrides() {
        // SAFETY: no other test reads or writes these variables.
        unsafe {
            std::env::set_var("FRAUDSCOPE__VALIDATION__REQUIRE_STATE", "false");
            std::env::set_var("FRAUDSCOPE__ARTIFACTS__MODEL_PATH", "x.onnx");
        }
        let loaded = AppConfig::load(None);
        unsafe {
            std::env::remove_var("FRAUDSCOPE__VALIDATION__REQUIRE_STATE");
            std::env::remove_var("FRAUDSCOPE__ARTIFACTS__MODEL_PATH");
        }

        let config = loaded.unwrap();
        assert!(!config.validation.require_state);
        assert_eq!(config.artifacts.model_path, PathBuf::from("x.onnx"));
        assert_eq!(config.artifacts.encoders_path, PathBuf::from("label_encoders.json"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("does/not/exist.toml"))).is_err());
    }
}
