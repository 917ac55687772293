//! Error types for building and reporting on example models.

use thiserror::Error;

use tally_core::TallyError;
use tally_engine::{ConfigError, EngineError};

/// A specialized Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while loading assumptions, building a model or evaluating a report.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A scenario file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A scenario file has an extension other than `.toml` or `.json`.
    #[error("unsupported scenario format '{0}', expected .toml or .json")]
    UnsupportedFormat(String),

    /// No example model goes by this name.
    #[error("unknown model '{0}', expected one of: simple, rent-roll, three-statement")]
    UnknownModel(String),

    /// Assumptions failed to parse or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The model tree was rejected.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Evaluation failed.
    #[error(transparent)]
    Tally(#[from] TallyError),
}

impl From<toml::de::Error> for ModelError {
    fn from(err: toml::de::Error) -> Self {
        ModelError::Config(ConfigError::Deserialization(err.to_string()))
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Config(ConfigError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_become_config_errors() {
        let err: ModelError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ModelError::Config(ConfigError::Deserialization(_))));

        let err: ModelError = toml::from_str::<toml::Table>("= 1").unwrap_err().into();
        assert!(err.to_string().starts_with("Deserialization error"));
    }

    #[test]
    fn test_unknown_model_message() {
        let err = ModelError::UnknownModel("dcf".into());
        assert!(err.to_string().contains("'dcf'"));
    }
}
