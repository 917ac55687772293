//! Describe command implementation.
//!
//! Prints a model's line items, what each one reads, and its item type.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use tally_models::ModelKind;

use crate::cli::OutputFormat;
use crate::commands::parse_model;
use crate::output::print_tree;

/// Arguments for the describe command.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Model to describe: simple, rent-roll or three-statement
    #[arg(value_parser = parse_model)]
    pub model: ModelKind,

    /// Scenario file (TOML or JSON); the tree of a rent roll depends on its units
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,
}

/// Execute the describe command.
pub fn execute(args: DescribeArgs, format: OutputFormat) -> Result<()> {
    let built = args.model.build(args.scenario.as_deref())?;
    let descriptor = built.model.describe(built.model.root());
    tracing::debug!(model = %args.model, nodes = descriptor.count(), "described");
    print_tree(&descriptor, format)
}
