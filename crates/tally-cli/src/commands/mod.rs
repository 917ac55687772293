//! CLI command implementations.

pub mod describe;
pub mod project;
pub mod sensitivity;

// Re-export submodules for convenience
pub use describe::DescribeArgs;
pub use project::ProjectArgs;
pub use sensitivity::SensitivityArgs;

use tally_models::ModelKind;

use crate::error::{CliError, CliResult};

/// Longest projection the CLI will run, in periods.
pub const MAX_PERIODS: usize = 400;

/// Parses a model name such as `rent-roll`.
pub fn parse_model(s: &str) -> CliResult<ModelKind> {
    s.parse().map_err(|_| {
        let names = ModelKind::ALL.map(|kind| kind.name()).join(", ");
        CliError::UnknownModel(s.to_string(), names)
    })
}

/// Validates a period count.
pub fn validate_periods(periods: usize) -> CliResult<usize> {
    if periods == 0 || periods > MAX_PERIODS {
        return Err(CliError::InvalidPeriods(periods));
    }
    Ok(periods)
}

/// Validates an annual growth rate.
pub fn validate_growth(growth: f64) -> CliResult<f64> {
    if !growth.is_finite() || growth <= -1.0 {
        return Err(CliError::InvalidGrowth(growth));
    }
    Ok(growth)
}
