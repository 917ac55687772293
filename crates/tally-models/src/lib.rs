//! # Tally Models
//!
//! Example projection models built on the Tally engine, with scenario
//! loading and periodic reports.
//!
//! - [`simple`]: a five-line income model
//! - [`rent_roll`]: unit leases rolled into effective gross income
//! - [`three_statement`]: linked statements with a revolver and interest loop
//!
//! ## Example
//!
//! ```rust
//! use tally_models::prelude::*;
//!
//! let built = ModelKind::Simple.build(None).unwrap();
//! let report = built.report(4).unwrap();
//! assert_eq!(report.dates.len(), 4);
//! assert!(report.row("Net income").is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use tally_core::Date;

pub mod error;
pub mod items;
pub mod rent_roll;
pub mod report;
pub mod scenario;
pub mod simple;
pub mod three_statement;

// Re-exports
pub use error::{ModelError, ModelResult};
pub use report::{BuiltModel, Measure, Report, ReportLine, ReportRow};
pub use scenario::{load_assumptions, ModelKind};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::rent_roll::RentRollAssumptions;
    pub use crate::report::{BuiltModel, Measure, Report, ReportLine, ReportRow};
    pub use crate::scenario::{load_assumptions, ModelKind};
    pub use crate::simple::SimpleAssumptions;
    pub use crate::three_statement::ThreeStatementAssumptions;
}

/// Calendar date for built-in defaults, which are always valid.
pub(crate) fn ymd(year: i32, month: u32, day: u32) -> Date {
    NaiveDate::from_ymd_opt(year, month, day).map_or(Date::MIN, Date::from)
}
