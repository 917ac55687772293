//! Output formatting utilities.

use colored::Colorize;
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use tally_engine::NodeDescriptor;
use tally_models::Report;

use crate::cli::OutputFormat;

/// Formats and prints rows based on the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print_table(data),
        OutputFormat::Json => print_json(data),
        OutputFormat::Csv => print_csv(data),
        OutputFormat::Minimal => print_minimal(data),
    }
}

/// Prints data as a formatted table.
fn print_table<T: Tabled>(data: &[T]) -> anyhow::Result<()> {
    if data.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let table = Table::new(data)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()))
        .to_string();

    println!("{table}");
    Ok(())
}

/// Prints data as JSON.
fn print_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Prints data as CSV.
fn print_csv<T: Serialize>(data: &[T]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for item in data {
        wtr.serialize(item)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Prints one JSON line per row.
fn print_minimal<T: Serialize>(data: &[T]) -> anyhow::Result<()> {
    for item in data {
        println!("{}", serde_json::to_string(item)?);
    }
    Ok(())
}

/// Prints a report with one column per period end.
pub fn print_report(report: &Report, format: OutputFormat) -> anyhow::Result<()> {
    let header = std::iter::once("Line".to_string())
        .chain(report.dates.iter().map(ToString::to_string));
    match format {
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(header);
            for row in &report.rows {
                builder.push_record(
                    std::iter::once(row.label.clone())
                        .chain(row.values.iter().map(format_amount)),
                );
            }
            let table = builder
                .build()
                .with(Style::rounded())
                .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
                .to_string();
            println!("{table}");
        }
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(header)?;
            for row in &report.rows {
                wtr.write_record(
                    std::iter::once(row.label.clone())
                        .chain(row.values.iter().map(ToString::to_string)),
                )?;
            }
            wtr.flush()?;
        }
        OutputFormat::Minimal => {
            for row in &report.rows {
                println!("{}\t{:.2}", row.label, row.total());
            }
        }
    }
    Ok(())
}

/// Prints a model tree as an outline, or as JSON.
pub fn print_tree(descriptor: &NodeDescriptor, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(descriptor),
        OutputFormat::Table | OutputFormat::Csv | OutputFormat::Minimal => {
            print!("{}", descriptor.pretty(2));
            Ok(())
        }
    }
}

/// Formats an amount with two decimals; negative amounts in red.
pub fn format_amount(value: &f64) -> String {
    let text = format!("{value:.2}");
    if *value < -0.005 {
        text.red().to_string()
    } else {
        text
    }
}

/// Formats a fraction as a percentage string.
pub fn format_percent(value: &f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Prints a header for a section.
pub fn print_header(title: &str) {
    println!("\n{}", title.bold().underline());
}
