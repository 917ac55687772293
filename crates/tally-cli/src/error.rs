//! CLI error types.

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Unknown model name.
    #[error("Unknown model: {0}. Use one of: {1}.")]
    UnknownModel(String, String),

    /// Period count out of range.
    #[error("Invalid period count: {0}. Must be between 1 and {max}.", max = crate::commands::MAX_PERIODS)]
    InvalidPeriods(usize),

    /// Growth rate out of range.
    #[error("Invalid growth rate: {0}. Must be above -1.")]
    InvalidGrowth(f64),
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
