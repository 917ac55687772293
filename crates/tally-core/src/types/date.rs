//! Date type for projection schedules.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::{TallyError, TallyResult};

/// A calendar date used for periods, payments and balances.
///
/// This is a newtype wrapper around `chrono::NaiveDate`. [`Date::MAX`] doubles
/// as the "forever after" sentinel for open-ended periods.
///
/// # Example
///
/// ```rust
/// use tally_core::types::Date;
///
/// let date = Date::from_ymd(2025, 3, 31).unwrap();
/// let next = date.add_months(3).unwrap();
/// assert_eq!(next, Date::from_ymd(2025, 6, 30).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Date(NaiveDate);

impl Date {
    /// The latest representable date. Marks an unbounded period end.
    pub const MAX: Date = Date(NaiveDate::MAX);

    /// The earliest representable date.
    pub const MIN: Date = Date(NaiveDate::MIN);

    /// Creates a new date from year, month, and day.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::InvalidDate` if the date is invalid.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> TallyResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or_else(|| TallyError::invalid_date(format!("{year}-{month:02}-{day:02}")))
    }

    /// Creates a date from an ISO 8601 string (YYYY-MM-DD).
    ///
    /// # Errors
    ///
    /// Returns `TallyError::InvalidDate` if the string is not a valid date.
    pub fn parse(s: &str) -> TallyResult<Self> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Date)
            .map_err(|_| TallyError::invalid_date(format!("Cannot parse: {s}")))
    }

    /// Returns the year component.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the month component (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the day component (1-31).
    #[must_use]
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Checks if the year is a leap year.
    #[must_use]
    pub fn is_leap_year(&self) -> bool {
        self.0.leap_year()
    }

    /// Returns the number of days in the date's month.
    #[must_use]
    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year(), self.month())
    }

    /// True for the [`Date::MAX`] sentinel.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        *self == Self::MAX
    }

    /// Adds a number of days to the date, saturating at the representable range.
    #[must_use]
    pub fn add_days(&self, days: i64) -> Self {
        let shifted = self.0.checked_add_signed(chrono::Duration::days(days));
        match shifted {
            Some(date) => Date(date),
            None if days > 0 => Self::MAX,
            None => Self::MIN,
        }
    }

    /// Adds a number of months to the date.
    ///
    /// If the resulting day would be invalid (e.g., Jan 31 + 1 month),
    /// it rolls back to the last valid day of the month.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::InvalidDate` if the result is out of range.
    pub fn add_months(&self, months: i32) -> TallyResult<Self> {
        let total_months = self.year() * 12 + self.month() as i32 - 1 + months;
        let new_year = total_months.div_euclid(12);
        let new_month = (total_months.rem_euclid(12) + 1) as u32;

        let max_day = days_in_month(new_year, new_month);
        let new_day = self.day().min(max_day);

        Self::from_ymd(new_year, new_month, new_day)
    }

    /// Adds a number of months and snaps the result to the end of its month.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::InvalidDate` if the result is out of range.
    pub fn add_months_to_month_end(&self, months: i32) -> TallyResult<Self> {
        Ok(self.add_months(months)?.end_of_month())
    }

    /// Adds a number of years to the date.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::InvalidDate` if the result is invalid.
    pub fn add_years(&self, years: i32) -> TallyResult<Self> {
        self.add_months(years * 12)
    }

    /// Calculates the number of calendar days between two dates.
    #[must_use]
    pub fn days_between(&self, other: &Date) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// Returns the underlying `NaiveDate`.
    #[must_use]
    pub fn as_naive_date(&self) -> NaiveDate {
        self.0
    }

    /// Returns the end of month for the current date.
    #[must_use]
    pub fn end_of_month(&self) -> Self {
        self.with_day(self.days_in_month())
    }

    /// Returns the first day of the month.
    #[must_use]
    pub fn start_of_month(&self) -> Self {
        self.with_day(1)
    }

    /// Checks if the date is the end of month.
    #[must_use]
    pub fn is_end_of_month(&self) -> bool {
        self.day() == self.days_in_month()
    }

    /// Returns the minimum of two dates.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    /// Returns the maximum of two dates.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    fn with_day(&self, day: u32) -> Self {
        // The day is always within 1..=days_in_month for the current month.
        self.0.with_day(day).map_or(*self, Date)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "max")
        } else {
            write!(f, "{}", self.0.format("%Y-%m-%d"))
        }
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Date(date)
    }
}

impl From<Date> for NaiveDate {
    fn from(date: Date) -> Self {
        date.0
    }
}

impl std::str::FromStr for Date {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Add<i64> for Date {
    type Output = Self;

    /// Adds days to a date.
    fn add(self, days: i64) -> Self::Output {
        self.add_days(days)
    }
}

impl Sub<i64> for Date {
    type Output = Self;

    /// Subtracts days from a date.
    fn sub(self, days: i64) -> Self::Output {
        self.add_days(-days)
    }
}

impl Sub<Date> for Date {
    type Output = i64;

    /// Returns the number of days between two dates.
    fn sub(self, other: Date) -> Self::Output {
        other.days_between(&self)
    }
}

/// Number of days in `month` of `year`.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_creation() {
        let date = Date::from_ymd(2025, 6, 15).unwrap();
        assert_eq!(date.year(), 2025);
        assert_eq!(date.month(), 6);
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_invalid_date() {
        assert!(Date::from_ymd(2025, 2, 30).is_err());
        assert!(Date::from_ymd(2025, 13, 1).is_err());
    }

    #[test]
    fn test_parse() {
        let date = Date::parse("2024-02-29").unwrap();
        assert_eq!(date, Date::from_ymd(2024, 2, 29).unwrap());
        assert!(Date::parse("2023-02-29").is_err());
        assert!("not a date".parse::<Date>().is_err());
    }

    #[test]
    fn test_add_months_clamps_day() {
        let date = Date::from_ymd(2025, 1, 31).unwrap();
        assert_eq!(date.add_months(1).unwrap(), Date::from_ymd(2025, 2, 28).unwrap());
        assert_eq!(date.add_months(-2).unwrap(), Date::from_ymd(2024, 11, 30).unwrap());
        assert_eq!(date.add_months(13).unwrap(), Date::from_ymd(2026, 2, 28).unwrap());
    }

    #[test]
    fn test_add_months_to_month_end() {
        let date = Date::from_ymd(2025, 6, 30).unwrap();
        assert_eq!(
            date.add_months_to_month_end(3).unwrap(),
            Date::from_ymd(2025, 9, 30).unwrap()
        );
        assert_eq!(
            date.add_months_to_month_end(6).unwrap(),
            Date::from_ymd(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_end_of_month() {
        let date = Date::from_ymd(2024, 2, 10).unwrap();
        assert_eq!(date.end_of_month(), Date::from_ymd(2024, 2, 29).unwrap());
        assert!(date.end_of_month().is_end_of_month());
        assert_eq!(date.start_of_month(), Date::from_ymd(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_add_days_saturates() {
        assert_eq!(Date::MAX.add_days(1), Date::MAX);
        assert_eq!(Date::MIN.add_days(-1), Date::MIN);
        let date = Date::from_ymd(2024, 12, 31).unwrap();
        assert_eq!(date + 1, Date::from_ymd(2025, 1, 1).unwrap());
        assert_eq!(date - 366, Date::from_ymd(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_days_between() {
        let start = Date::from_ymd(2024, 1, 1).unwrap();
        let end = Date::from_ymd(2025, 1, 1).unwrap();
        assert_eq!(start.days_between(&end), 366);
        assert_eq!(end - start, 366);
    }

    #[test]
    fn test_display() {
        let date = Date::from_ymd(2025, 3, 31).unwrap();
        assert_eq!(date.to_string(), "2025-03-31");
        assert_eq!(Date::MAX.to_string(), "max");
    }

    #[test]
    fn test_serde_roundtrip() {
        let date = Date::from_ymd(2025, 3, 31).unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2025-03-31\"");
        assert_eq!(serde_json::from_str::<Date>(&json).unwrap(), date);
    }
}
