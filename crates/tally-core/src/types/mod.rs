//! Calendar types for projection schedules.
//!
//! - [`Date`]: Calendar date, with [`Date::MAX`] as the unbounded sentinel
//! - [`Period`]: Half-open date interval `[start, end)`
//! - [`Frequency`]: Schedule step between periods
//! - [`DateRoll`]: Day-of-month rule applied when stepping months

mod date;
mod frequency;
mod period;

pub use date::Date;
pub use frequency::{DateRoll, Frequency};
pub use period::{Period, PeriodSchedule};
