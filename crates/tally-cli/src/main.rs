//! Tally CLI - Command-line interface for financial projection models.
//!
//! # Usage
//!
//! ```bash
//! # Print a model's line-item tree
//! tally describe three-statement
//!
//! # Project a model quarterly, optionally from a scenario file
//! tally project rent-roll --periods 8
//! tally project simple --scenario downside.toml --format csv
//!
//! # Net income of the simple model across growth rates
//! tally sensitivity --growth 0.05,0.10,0.15
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so table, JSON and CSV output stays clean.
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tally=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli.format;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Describe(args) => commands::describe::execute(args, format)?,
        Commands::Project(args) => commands::project::execute(args, format, quiet)?,
        Commands::Sensitivity(args) => commands::sensitivity::execute(args, format, quiet)?,
    }

    Ok(())
}
