//! Scope options and configuration validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration operation result type.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Validation error.
    #[error("Validation error: {field}: {message}")]
    Validation {
        /// Field that failed validation.
        field: String,
        /// Validation error message.
        message: String,
    },

    /// Multiple validation errors.
    #[error("Multiple validation errors: {}", format_errors(.0))]
    MultipleValidationErrors(Vec<ValidationError>),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Validation error message.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Deserialization(err.to_string())
    }
}

/// Trait for validatable configurations.
pub trait Validate {
    /// Returns every problem found, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and returns an error if invalid.
    fn validate_or_error(&self) -> ConfigResult<()> {
        let mut errors = self.validate();
        match errors.len() {
            0 => Ok(()),
            1 => {
                let err = errors.remove(0);
                Err(ConfigError::Validation {
                    field: err.field,
                    message: err.message,
                })
            }
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Default limit on nested element production within one scope.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Options for an evaluation scope.
///
/// # Example
///
/// ```rust
/// use tally_engine::config::{ScopeOptions, Validate};
///
/// let options = ScopeOptions::default().with_max_depth(64);
/// assert!(options.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeOptions {
    /// How many element productions may be in progress at once before the
    /// scope reports unbounded recursion.
    pub max_depth: usize,
    /// Whether `accrue`/`over`/`at`/`w_avg` results are memoized per scope.
    pub cache_queries: bool,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            cache_queries: true,
        }
    }
}

impl ScopeOptions {
    /// Builder method to set the nesting limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builder method to enable or disable the query cache.
    #[must_use]
    pub fn with_cache_queries(mut self, cache_queries: bool) -> Self {
        self.cache_queries = cache_queries;
        self
    }
}

impl Validate for ScopeOptions {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.max_depth == 0 {
            errors.push(ValidationError::new("max_depth", "must be at least 1"));
        }
        if self.max_depth > 100_000 {
            errors.push(ValidationError::new(
                "max_depth",
                "must not exceed 100000; deeper nesting overflows the stack first",
            ));
        }
        errors
    }
}
