//! Sensitivity command implementation.
//!
//! Runs the simple model once per growth rate. Every run builds its own model
//! and scope, so the runs proceed in parallel.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use tabled::Tabled;

use tally_models::simple::{self, SimpleAssumptions};
use tally_models::{load_assumptions, ModelResult, ReportRow};

use crate::cli::OutputFormat;
use crate::commands::{validate_growth, validate_periods};
use crate::output::{format_amount, format_percent, print_header, print_output};

/// Arguments for the sensitivity command.
#[derive(Args, Debug)]
pub struct SensitivityArgs {
    /// Annual revenue growth rates (comma-separated, e.g., "0.05,0.10,0.15")
    #[arg(
        short,
        long,
        value_delimiter = ',',
        required = true,
        allow_negative_numbers = true
    )]
    pub growth: Vec<f64>,

    /// Scenario file (TOML or JSON) for the other assumptions
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Number of quarters to total
    #[arg(short, long, default_value = "8")]
    pub periods: usize,
}

/// Totals of one sensitivity run.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SensitivityRow {
    #[tabled(rename = "Growth", display_with = "format_percent")]
    pub growth: f64,
    #[tabled(rename = "Revenue", display_with = "format_amount")]
    pub revenue: f64,
    #[tabled(rename = "Net Income", display_with = "format_amount")]
    pub net_income: f64,
}

fn run(base: &SimpleAssumptions, growth: f64, periods: usize) -> ModelResult<SensitivityRow> {
    let built = simple::build(&base.clone().with_revenue_growth(growth))?;
    let report = built.report(periods)?;
    let total = |label: &str| report.row(label).map_or(0.0, ReportRow::total);
    Ok(SensitivityRow {
        growth,
        revenue: total("Revenue"),
        net_income: total("Net income"),
    })
}

/// Execute the sensitivity command.
pub fn execute(args: SensitivityArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let periods = validate_periods(args.periods)?;
    for growth in &args.growth {
        validate_growth(*growth)?;
    }
    let base: SimpleAssumptions = match &args.scenario {
        Some(path) => load_assumptions(path)?,
        None => SimpleAssumptions::default(),
    };

    let rows = args
        .growth
        .par_iter()
        .map(|growth| run(&base, *growth, periods))
        .collect::<ModelResult<Vec<_>>>()?;
    tracing::debug!(runs = rows.len(), periods, "sensitivity complete");

    if !quiet && format == OutputFormat::Table {
        print_header(&format!("Net income over {periods} quarters"));
    }
    print_output(&rows, format)
}
