//! Project command implementation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use tally_models::ModelKind;

use crate::cli::OutputFormat;
use crate::commands::{parse_model, validate_periods};
use crate::output::{print_header, print_report};

/// Arguments for the project command.
#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Model to project: simple, rent-roll or three-statement
    #[arg(value_parser = parse_model)]
    pub model: ModelKind,

    /// Scenario file (TOML or JSON) overriding the default assumptions
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Number of reporting periods
    #[arg(short, long, default_value = "8")]
    pub periods: usize,
}

/// Execute the project command.
pub fn execute(args: ProjectArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let periods = validate_periods(args.periods)?;
    let built = args.model.build(args.scenario.as_deref())?;
    let report = built.report(periods)?;

    if !quiet && format == OutputFormat::Table {
        let source = args
            .scenario
            .as_ref()
            .map_or_else(|| "base case".to_string(), |path| path.display().to_string());
        print_header(&format!("{} ({source})", args.model));
    }
    print_report(&report, format)
}
