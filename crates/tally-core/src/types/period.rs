//! Half-open date periods and period schedules.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Date, DateRoll, Frequency};
use crate::daycounts::DayCountConvention;
use crate::error::{TallyError, TallyResult};

/// A half-open date interval `[start, end)`.
///
/// An end of [`Date::MAX`] means "forever after". Such periods are only
/// meaningful as the terminal element of an assumption schedule and cannot be
/// converted to a finite year fraction.
///
/// # Example
///
/// ```rust
/// use tally_core::daycounts::DayCountConvention;
/// use tally_core::types::{Date, Period};
///
/// let q1 = Period::new(
///     Date::from_ymd(2024, 1, 1).unwrap(),
///     Date::from_ymd(2024, 4, 1).unwrap(),
/// ).unwrap();
/// let yf = q1.year_fraction(DayCountConvention::CalendarMonthly).unwrap();
/// assert_eq!(yf, 0.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    start: Date,
    end: Date,
}

impl Period {
    /// Creates a period. Zero-length periods are allowed.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::InvalidPeriod` if `end < start`.
    pub fn new(start: Date, end: Date) -> TallyResult<Self> {
        if end < start {
            return Err(TallyError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates a period that never ends.
    #[must_use]
    pub fn open(start: Date) -> Self {
        Self {
            start,
            end: Date::MAX,
        }
    }

    /// Inclusive start date.
    #[must_use]
    pub fn start(&self) -> Date {
        self.start
    }

    /// Exclusive end date.
    #[must_use]
    pub fn end(&self) -> Date {
        self.end
    }

    /// True if the period runs forever.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.end.is_unbounded()
    }

    /// True if `start == end`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `start <= date < end`.
    #[must_use]
    pub fn contains_date(&self, date: Date) -> bool {
        self.start <= date && date < self.end
    }

    /// True if `other` lies entirely within this period.
    #[must_use]
    pub fn contains(&self, other: &Period) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The non-empty overlap of two periods, if any.
    #[must_use]
    pub fn intersection(&self, other: &Period) -> Option<Period> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Period { start, end })
    }

    /// Year fraction of the period under `convention`.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` if the period is unbounded.
    pub fn year_fraction(&self, convention: DayCountConvention) -> TallyResult<f64> {
        if self.is_unbounded() {
            return Err(TallyError::range(format!(
                "unbounded period {self} has no finite year fraction"
            )));
        }
        Ok(convention.year_fraction(self.start, self.end))
    }

    /// Splits the period at `at` into `[start, at)` and `[at, end)`.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` unless `start < at < end`.
    pub fn split(&self, at: Date) -> TallyResult<(Period, Period)> {
        if at <= self.start || at >= self.end {
            return Err(TallyError::range(format!("cannot split {self} at {at}")));
        }
        Ok((
            Period {
                start: self.start,
                end: at,
            },
            Period {
                start: at,
                end: self.end,
            },
        ))
    }

    /// An infinite schedule of consecutive periods starting at `start`.
    ///
    /// The first period starts exactly at `start`. Every later boundary is
    /// `start` stepped by whole multiples of the frequency under `roll`, so
    /// schedules never drift on short months.
    ///
    /// ```rust
    /// use tally_core::types::{Date, DateRoll, Frequency, Period};
    ///
    /// let start = Date::from_ymd(2020, 12, 31).unwrap();
    /// let quarters: Vec<Period> = Period::series(start, Frequency::Quarterly, DateRoll::MonthEnd)
    ///     .take(2)
    ///     .collect();
    /// assert_eq!(quarters[1].end(), Date::from_ymd(2021, 6, 30).unwrap());
    /// ```
    #[must_use]
    pub fn series(start: Date, frequency: Frequency, roll: DateRoll) -> PeriodSchedule {
        PeriodSchedule {
            anchor: start,
            months: frequency.months_per_period() as i32,
            roll,
            index: 0,
            until: None,
            current: Some(start),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Iterator over consecutive periods produced by [`Period::series`].
#[derive(Debug, Clone)]
pub struct PeriodSchedule {
    anchor: Date,
    months: i32,
    roll: DateRoll,
    index: i32,
    until: Option<Date>,
    current: Option<Date>,
}

impl PeriodSchedule {
    /// Stops the schedule at the last period ending on or before `end`.
    #[must_use]
    pub fn until(mut self, end: Date) -> Self {
        self.until = Some(end);
        self
    }

    /// Stops the schedule after `months` months from the anchor.
    #[must_use]
    pub fn for_months(self, months: i32) -> Self {
        let anchor = self.anchor;
        let roll = self.roll;
        match roll.advance(anchor, months) {
            Ok(end) => self.until(end),
            Err(_) => self,
        }
    }
}

impl Iterator for PeriodSchedule {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        let start = self.current?;
        let end = self
            .roll
            .advance(self.anchor, self.months * (self.index + 1))
            .ok()?;
        if self.until.is_some_and(|limit| end > limit) {
            self.current = None;
            return None;
        }
        self.index += 1;
        self.current = Some(end);
        Some(Period { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn test_new_rejects_reversed() {
        assert!(Period::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
        assert!(Period::new(date(2024, 1, 1), date(2024, 1, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_contains_and_intersection() {
        let year = Period::new(date(2024, 1, 1), date(2025, 1, 1)).unwrap();
        let q2 = Period::new(date(2024, 4, 1), date(2024, 7, 1)).unwrap();
        let straddle = Period::new(date(2024, 12, 1), date(2025, 2, 1)).unwrap();

        assert!(year.contains(&q2));
        assert!(!year.contains(&straddle));
        assert!(year.contains_date(date(2024, 1, 1)));
        assert!(!year.contains_date(date(2025, 1, 1)));
        assert_eq!(
            year.intersection(&straddle),
            Some(Period::new(date(2024, 12, 1), date(2025, 1, 1)).unwrap())
        );
        let after = Period::new(date(2025, 1, 1), date(2025, 2, 1)).unwrap();
        assert_eq!(year.intersection(&after), None);
    }

    #[test]
    fn test_year_fraction_unbounded_fails() {
        let open = Period::open(date(2030, 12, 31));
        assert!(open.is_unbounded());
        assert!(matches!(
            open.year_fraction(DayCountConvention::CalendarMonthly),
            Err(TallyError::Range { .. })
        ));
    }

    #[test]
    fn test_zero_length_year_fraction() {
        let empty = Period::new(date(2024, 5, 5), date(2024, 5, 5)).unwrap();
        for convention in DayCountConvention::all() {
            assert_eq!(empty.year_fraction(*convention).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_split() {
        let q1 = Period::new(date(2024, 1, 1), date(2024, 4, 1)).unwrap();
        let (left, right) = q1.split(date(2024, 2, 15)).unwrap();
        assert_eq!(left.end(), right.start());
        assert_eq!(left.start(), q1.start());
        assert_eq!(right.end(), q1.end());
        assert!(q1.split(date(2024, 1, 1)).is_err());
        assert!(q1.split(date(2024, 4, 1)).is_err());
    }

    #[test]
    fn test_month_end_series() {
        let quarters: Vec<Period> =
            Period::series(date(2024, 12, 31), Frequency::Quarterly, DateRoll::MonthEnd)
                .take(4)
                .collect();
        let ends: Vec<Date> = quarters.iter().map(Period::end).collect();
        assert_eq!(
            ends,
            vec![
                date(2025, 3, 31),
                date(2025, 6, 30),
                date(2025, 9, 30),
                date(2025, 12, 31)
            ]
        );
        for pair in quarters.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
    }

    #[test]
    fn test_same_day_series_does_not_drift() {
        let months: Vec<Period> =
            Period::series(date(2025, 1, 31), Frequency::Monthly, DateRoll::SameDay)
                .take(3)
                .collect();
        assert_eq!(months[0].end(), date(2025, 2, 28));
        assert_eq!(months[1].end(), date(2025, 3, 31));
    }

    #[test]
    fn test_bounded_series() {
        let count = Period::series(date(2023, 12, 31), Frequency::Quarterly, DateRoll::MonthEnd)
            .for_months(36)
            .count();
        assert_eq!(count, 12);

        let until = Period::series(date(2024, 1, 1), Frequency::SemiAnnual, DateRoll::SameDay)
            .until(date(2025, 3, 1))
            .count();
        assert_eq!(until, 2);
    }

    #[test]
    fn test_display() {
        let q1 = Period::new(date(2024, 1, 1), date(2024, 4, 1)).unwrap();
        assert_eq!(q1.to_string(), "[2024-01-01, 2024-04-01)");
        assert_eq!(Period::open(date(2024, 1, 1)).to_string(), "[2024-01-01, max)");
    }
}
