//! # Tally Core
//!
//! Time-series building blocks for the Tally financial projection engine.
//!
//! - **Types**: `Date`, half-open `Period`s and period schedules
//! - **Day Counts**: calendar-monthly, 30/360 and actual conventions
//! - **Primitives**: accruals, payments and balances over lazy `Value`s
//! - **Series**: restartable, date-ordered sequences with an addition algebra
//!
//! ## Example
//!
//! ```rust
//! use tally_core::prelude::*;
//!
//! let start = Date::from_ymd(2024, 12, 31).unwrap();
//! let quarters = Period::series(start, Frequency::Quarterly, DateRoll::MonthEnd);
//! let rent = AccrualSeries::generate(move || {
//!     quarters.clone().map(|period| Accrual::cmonthly(period, 300.0))
//! });
//!
//! let january = rent.accrue(start, Date::from_ymd(2025, 1, 31).unwrap()).unwrap();
//! assert!((january - 100.0).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::float_cmp)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]

pub mod daycounts;
pub mod error;
pub mod primitives;
pub mod series;
pub mod types;
pub mod value;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::daycounts::{DayCount, DayCountConvention};
    pub use crate::error::{TallyError, TallyResult};
    pub use crate::primitives::{Accrual, Balance, Payment};
    pub use crate::series::{
        AccrualSeries, AnySeries, BalanceSeries, Element, PaymentSeries, Series, SeriesKind,
    };
    pub use crate::types::{Date, DateRoll, Frequency, Period, PeriodSchedule};
    pub use crate::value::Value;
}

// Re-export commonly used types at crate root
pub use daycounts::DayCountConvention;
pub use error::{TallyError, TallyResult};
pub use primitives::{Accrual, Balance, Payment};
pub use series::{AccrualSeries, AnySeries, BalanceSeries, PaymentSeries, Series, SeriesKind};
pub use types::{Date, Period};
pub use value::Value;
