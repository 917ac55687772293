//! Model selection and scenario files.
//!
//! A scenario is a TOML or JSON file holding a model's assumptions. Fields it
//! leaves out keep their defaults.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use tally_engine::config::Validate;

use crate::error::{ModelError, ModelResult};
use crate::report::BuiltModel;
use crate::{rent_roll, simple, three_statement};

/// Reads and validates assumptions from a `.toml` or `.json` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has another extension, fails
/// to parse or fails validation.
pub fn load_assumptions<T>(path: &Path) -> ModelResult<T>
where
    T: DeserializeOwned + Validate,
{
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if extension != "toml" && extension != "json" {
        return Err(ModelError::UnsupportedFormat(extension));
    }

    let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let assumptions: T = if extension == "toml" {
        toml::from_str(&text)?
    } else {
        serde_json::from_str(&text)?
    };
    assumptions.validate_or_error()?;
    info!(path = %path.display(), "scenario loaded");
    Ok(assumptions)
}

/// The example models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// Five-line income model.
    Simple,
    /// Rent roll to effective gross income.
    RentRoll,
    /// Linked three statement model.
    ThreeStatement,
}

impl ModelKind {
    /// Every model, in display order.
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Simple,
        ModelKind::RentRoll,
        ModelKind::ThreeStatement,
    ];

    /// Command-line name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Simple => "simple",
            ModelKind::RentRoll => "rent-roll",
            ModelKind::ThreeStatement => "three-statement",
        }
    }

    /// Builds the model from default assumptions, or from `scenario` if given.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario cannot be loaded or the model is rejected.
    pub fn build(&self, scenario: Option<&Path>) -> ModelResult<BuiltModel> {
        match self {
            ModelKind::Simple => simple::build(&load_or_default(scenario)?),
            ModelKind::RentRoll => rent_roll::build(&load_or_default(scenario)?),
            ModelKind::ThreeStatement => three_statement::build(&load_or_default(scenario)?),
        }
    }
}

fn load_or_default<T>(scenario: Option<&Path>) -> ModelResult<T>
where
    T: DeserializeOwned + Validate + Default,
{
    scenario.map_or_else(|| Ok(T::default()), load_assumptions)
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| ModelError::UnknownModel(s.to_string()))
    }
}
