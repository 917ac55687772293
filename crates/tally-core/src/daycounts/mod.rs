//! Day count conventions for projection periods.
//!
//! A day count converts a pair of ordered dates into a year fraction. Every
//! [`Accrual`](crate::primitives::Accrual) carries its own convention so that
//! series built on different conventions still combine.
//!
//! # Supported Conventions
//!
//! - [`CalendarMonthly`]: each whole calendar month is exactly 1/12 year, the
//!   trailing stub is pro-rated by actual days
//! - [`Thirty360US`]: 30/360 US (Bond Basis) with February end-of-month rules
//! - [`Act360`]: Actual/360
//! - [`Act365Fixed`]: Actual/365 Fixed
//!
//! # Usage
//!
//! ```rust
//! use tally_core::daycounts::{CalendarMonthly, DayCount, Thirty360US};
//! use tally_core::types::Date;
//!
//! let start = Date::from_ymd(2025, 3, 31).unwrap();
//! let end = Date::from_ymd(2025, 6, 30).unwrap();
//!
//! assert_eq!(CalendarMonthly.year_fraction(start, end), 0.25);
//! assert_eq!(Thirty360US.year_fraction(start, end), 0.25);
//! ```
//!
//! All conventions are pure and total over any pair of dates. Reversed dates
//! give the negated fraction and equal dates give zero.

mod actual;
mod cmonthly;
mod thirty360;

pub use actual::{Act360, Act365Fixed};
pub use cmonthly::CalendarMonthly;
pub use thirty360::Thirty360US;

use serde::{Deserialize, Serialize};

use crate::types::Date;

/// Trait for day count conventions.
///
/// Implementations must be thread-safe (`Send + Sync`) because conventions are
/// shared by every accrual in every series.
pub trait DayCount: Send + Sync {
    /// Returns the name of the day count convention.
    fn name(&self) -> &'static str;

    /// Calculates the year fraction between two dates.
    ///
    /// Negative if `end < start`, zero if the dates are equal.
    fn year_fraction(&self, start: Date, end: Date) -> f64;

    /// Calculates the day count between two dates.
    ///
    /// For ACT and calendar-month conventions, this is actual calendar days.
    /// For 30/360, this uses the 30-day month assumption.
    fn day_count(&self, start: Date, end: Date) -> i64;
}

/// Enumeration of all supported day count conventions.
///
/// The declaration order is significant: when a merged segment combines
/// accruals of different conventions, the earliest variant in this order wins.
///
/// # Example
///
/// ```rust
/// use tally_core::daycounts::DayCountConvention;
/// use tally_core::types::Date;
///
/// let convention: DayCountConvention = "30/360".parse().unwrap();
/// let start = Date::from_ymd(2025, 1, 1).unwrap();
/// let end = Date::from_ymd(2025, 7, 1).unwrap();
/// assert_eq!(convention.year_fraction(start, end), 0.5);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum DayCountConvention {
    /// Calendar-month-constant (whole months are 1/12 year)
    #[default]
    #[serde(rename = "cmonthly")]
    CalendarMonthly,

    /// 30/360 US (Bond Basis)
    #[serde(rename = "30/360")]
    Thirty360,

    /// Actual/360
    #[serde(rename = "ACT/360")]
    Act360,

    /// Actual/365 Fixed
    #[serde(rename = "ACT/365F")]
    Act365Fixed,
}

impl DayCountConvention {
    /// Returns the shared implementation for this convention.
    #[must_use]
    pub fn day_count(&self) -> &'static dyn DayCount {
        match self {
            DayCountConvention::CalendarMonthly => &CalendarMonthly,
            DayCountConvention::Thirty360 => &Thirty360US,
            DayCountConvention::Act360 => &Act360,
            DayCountConvention::Act365Fixed => &Act365Fixed,
        }
    }

    /// Year fraction between two dates under this convention.
    #[must_use]
    pub fn year_fraction(&self, start: Date, end: Date) -> f64 {
        self.day_count().year_fraction(start, end)
    }

    /// Returns the display name of the convention.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.day_count().name()
    }

    /// Returns all available day count conventions.
    #[must_use]
    pub fn all() -> &'static [DayCountConvention] {
        &[
            DayCountConvention::CalendarMonthly,
            DayCountConvention::Thirty360,
            DayCountConvention::Act360,
            DayCountConvention::Act365Fixed,
        ]
    }
}

impl std::fmt::Display for DayCountConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for DayCountConvention {
    type Err = DayCountParseError;

    /// Parses a day count convention from a string.
    ///
    /// Accepts display names ("cmonthly", "30/360", "ACT/360", "ACT/365F"),
    /// enum-style names and common aliases ("BOND", "ACTUAL/365").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "CMONTHLY" | "CALENDAR MONTHLY" | "CALENDARMONTHLY" | "MONTHLY" => {
                Ok(DayCountConvention::CalendarMonthly)
            }
            "30/360" | "30/360 US" | "30U/360" | "BOND" | "THIRTY360" => {
                Ok(DayCountConvention::Thirty360)
            }
            "ACT/360" | "ACTUAL/360" | "ACT360" => Ok(DayCountConvention::Act360),
            "ACT/365" | "ACT/365F" | "ACTUAL/365" | "ACT365FIXED" | "ACT365" => {
                Ok(DayCountConvention::Act365Fixed)
            }
            _ => Err(DayCountParseError(s.to_string())),
        }
    }
}

/// Error type for parsing day count conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCountParseError(pub String);

impl std::fmt::Display for DayCountParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown day count convention: '{}'", self.0)
    }
}

impl std::error::Error for DayCountParseError {}
