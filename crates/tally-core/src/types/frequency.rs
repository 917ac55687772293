//! Schedule frequency and date-roll rules.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Date;
use crate::error::TallyResult;

/// Step between consecutive schedule dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// One period per year
    Annual,
    /// Two periods per year
    SemiAnnual,
    /// Four periods per year - the reporting default
    #[default]
    Quarterly,
    /// Twelve periods per year
    Monthly,
}

impl Frequency {
    /// Returns the number of periods per year.
    #[must_use]
    pub fn periods_per_year(&self) -> u32 {
        match self {
            Frequency::Annual => 1,
            Frequency::SemiAnnual => 2,
            Frequency::Quarterly => 4,
            Frequency::Monthly => 12,
        }
    }

    /// Returns the number of months per period.
    #[must_use]
    pub fn months_per_period(&self) -> u32 {
        match self {
            Frequency::Annual => 12,
            Frequency::SemiAnnual => 6,
            Frequency::Quarterly => 3,
            Frequency::Monthly => 1,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Annual => "Annual",
            Frequency::SemiAnnual => "Semi-Annual",
            Frequency::Quarterly => "Quarterly",
            Frequency::Monthly => "Monthly",
        };
        write!(f, "{name}")
    }
}

/// How a schedule lands on the day of the month after stepping months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateRoll {
    /// Every generated date is the last day of its month.
    #[default]
    MonthEnd,
    /// Keep the anchor's day of month, clamped to the month length.
    SameDay,
}

impl DateRoll {
    /// Returns the date `months` months after `anchor` under this roll.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::InvalidDate` if the result is out of range.
    pub fn advance(&self, anchor: Date, months: i32) -> TallyResult<Date> {
        match self {
            DateRoll::MonthEnd => anchor.add_months_to_month_end(months),
            DateRoll::SameDay => anchor.add_months(months),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periods_per_year() {
        assert_eq!(Frequency::Quarterly.periods_per_year(), 4);
        assert_eq!(Frequency::SemiAnnual.months_per_period(), 6);
        assert_eq!(
            Frequency::Annual.months_per_period() * Frequency::Annual.periods_per_year(),
            12
        );
    }

    #[test]
    fn test_roll_month_end() {
        let anchor = Date::from_ymd(2025, 3, 31).unwrap();
        assert_eq!(
            DateRoll::MonthEnd.advance(anchor, 3).unwrap(),
            Date::from_ymd(2025, 6, 30).unwrap()
        );
        let feb = Date::from_ymd(2025, 2, 28).unwrap();
        assert_eq!(
            DateRoll::MonthEnd.advance(feb, 1).unwrap(),
            Date::from_ymd(2025, 3, 31).unwrap()
        );
        assert_eq!(
            DateRoll::SameDay.advance(feb, 1).unwrap(),
            Date::from_ymd(2025, 3, 28).unwrap()
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Frequency::SemiAnnual).unwrap();
        assert_eq!(json, "\"semi_annual\"");
        let roll: DateRoll = serde_json::from_str("\"same_day\"").unwrap();
        assert_eq!(roll, DateRoll::SameDay);
    }
}
