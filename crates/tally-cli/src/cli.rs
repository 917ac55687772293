//! CLI argument definitions.

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::{DescribeArgs, ProjectArgs, SensitivityArgs};

/// Tally - Lazy, cached financial projections
#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print a model's line-item tree
    Describe(DescribeArgs),

    /// Project a model over reporting periods
    Project(ProjectArgs),

    /// Run the simple model across revenue growth rates
    Sensitivity(SensitivityArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
    /// Minimal output (one value per line)
    Minimal,
}
