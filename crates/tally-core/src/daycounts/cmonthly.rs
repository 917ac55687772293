//! Calendar-month-constant day count.

use super::DayCount;
use crate::types::Date;

/// Calendar-month-constant day count convention.
///
/// Counts the whole months stepped from the start date, each worth exactly
/// 1/12 year regardless of its length. The remaining stub is pro-rated by
/// actual days against the length of the month it falls in.
///
/// A start date on the last day of its month steps month end to month end, so
/// `2025-02-28 -> 2025-03-31` is exactly one month. Any other start date keeps
/// its day of month, clamped to shorter months.
///
/// # Formula
///
/// $$YF = \frac{n + \frac{end - a_n}{a_{n+1} - a_n}}{12}$$
///
/// where $a_k$ is the start date stepped forward $k$ months and $n$ is the
/// largest $k$ with $a_k \le end$.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarMonthly;

impl CalendarMonthly {
    fn step(start: Date, months: i32) -> Date {
        let stepped = if start.is_end_of_month() {
            start.add_months_to_month_end(months)
        } else {
            start.add_months(months)
        };
        stepped.unwrap_or(Date::MAX)
    }

    fn whole_months(start: Date, end: Date) -> i32 {
        let months =
            (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
        if Self::step(start, months) > end {
            months - 1
        } else {
            months
        }
    }
}

impl DayCount for CalendarMonthly {
    fn name(&self) -> &'static str {
        "cmonthly"
    }

    fn year_fraction(&self, start: Date, end: Date) -> f64 {
        if end < start {
            return -self.year_fraction(end, start);
        }
        if end == start {
            return 0.0;
        }

        let months = Self::whole_months(start, end);
        let anchor = Self::step(start, months);
        let next = Self::step(start, months + 1);
        let stub = anchor.days_between(&end) as f64 / anchor.days_between(&next) as f64;

        (f64::from(months) + stub) / 12.0
    }

    fn day_count(&self, start: Date, end: Date) -> i64 {
        start.days_between(&end)
    }
}
