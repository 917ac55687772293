//! Timestamped value primitives: accruals, payments and balances.

use std::fmt;
use std::sync::Arc;

use crate::daycounts::DayCountConvention;
use crate::error::{TallyError, TallyResult};
use crate::types::{Date, Period};
use crate::value::Value;

// =============================================================================
// Accrual
// =============================================================================

/// An amount earned smoothly across a period.
///
/// The value is attributable pro-rata to any sub-period by day-count weight.
/// A part cut from an accrual, or a sum of such parts, remembers the accruals
/// it came from, so cutting it again weighs each source against its own
/// period and repeated cuts agree with a single cut.
///
/// # Example
///
/// ```rust
/// use tally_core::prelude::*;
///
/// let q1 = Period::new(
///     Date::from_ymd(2024, 1, 1).unwrap(),
///     Date::from_ymd(2024, 4, 1).unwrap(),
/// ).unwrap();
/// let revenue = Accrual::cmonthly(q1, 300.0);
///
/// let january = Period::new(q1.start(), Date::from_ymd(2024, 2, 1).unwrap()).unwrap();
/// assert!((revenue.attributed_value(&january).unwrap() - 100.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct Accrual {
    period: Period,
    value: Value,
    day_count: DayCountConvention,
    sources: Arc<[Source]>,
}

/// An accrual as originally stated, before any cutting.
#[derive(Debug, Clone)]
struct Source {
    period: Period,
    value: Value,
    day_count: DayCountConvention,
}

impl Source {
    /// Share of the source falling in `sub`, measured from the source's start.
    fn weight(&self, sub: &Period) -> TallyResult<f64> {
        if !self.period.contains(sub) {
            return Err(TallyError::range(format!(
                "{sub} is not within accrual period {}",
                self.period
            )));
        }
        if *sub == self.period {
            return Ok(1.0);
        }
        if sub.is_empty() {
            return Ok(0.0);
        }

        let total = self.period.year_fraction(self.day_count)?;
        let anchor = self.period.start();
        if total == 0.0 {
            // The convention assigns the period no length; fall back to actual days.
            let days = anchor.days_between(&self.period.end()) as f64;
            return Ok(sub.start().days_between(&sub.end()) as f64 / days);
        }

        let to_end = self.day_count.year_fraction(anchor, sub.end());
        let to_start = self.day_count.year_fraction(anchor, sub.start());
        Ok((to_end - to_start) / total)
    }

    fn value_over(&self, sub: &Period) -> TallyResult<Value> {
        let weight = self.weight(sub)?;
        if *sub == self.period {
            return Ok(self.value.clone());
        }
        Ok(self.value.map(move |v| v * weight))
    }

    fn scale(&self, factor: f64) -> Self {
        Self {
            period: self.period,
            value: self.value.map(move |v| v * factor),
            day_count: self.day_count,
        }
    }
}

impl Accrual {
    /// Creates an accrual.
    pub fn new(period: Period, value: impl Into<Value>, day_count: DayCountConvention) -> Self {
        let value = value.into();
        Self {
            period,
            value: value.clone(),
            day_count,
            sources: Arc::new([Source {
                period,
                value,
                day_count,
            }]),
        }
    }

    /// Creates an accrual under the calendar-month-constant convention.
    pub fn cmonthly(period: Period, value: impl Into<Value>) -> Self {
        Self::new(period, value, DayCountConvention::CalendarMonthly)
    }

    /// Creates an accrual under the 30/360 convention.
    pub fn thirty360(period: Period, value: impl Into<Value>) -> Self {
        Self::new(period, value, DayCountConvention::Thirty360)
    }

    /// The part of every source falling in `period`, summed.
    fn from_sources(
        period: Period,
        day_count: DayCountConvention,
        sources: Arc<[Source]>,
    ) -> TallyResult<Self> {
        let value = match &*sources {
            [single] => single.value_over(&period)?,
            many => Value::sum(
                many.iter()
                    .map(|source| source.value_over(&period))
                    .collect::<TallyResult<Vec<_>>>()?,
            ),
        };
        Ok(Self {
            period,
            value,
            day_count,
            sources,
        })
    }

    /// Sums accruals over one shared period.
    ///
    /// Each operand keeps its own sources, so later cuts of the sum attribute
    /// every operand by its own day count and period.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` if an operand's sources do not cover `period`.
    pub(crate) fn combine<'a>(
        period: Period,
        day_count: DayCountConvention,
        parts: impl IntoIterator<Item = &'a Accrual>,
    ) -> TallyResult<Self> {
        let sources: Vec<Source> = parts
            .into_iter()
            .flat_map(|part| part.sources.iter().cloned())
            .collect();
        Self::from_sources(period, day_count, sources.into())
    }

    /// The accrual period.
    #[must_use]
    pub fn period(&self) -> Period {
        self.period
    }

    /// Start of the accrual period.
    #[must_use]
    pub fn start(&self) -> Date {
        self.period.start()
    }

    /// End of the accrual period.
    #[must_use]
    pub fn end(&self) -> Date {
        self.period.end()
    }

    /// The day count used for attribution.
    #[must_use]
    pub fn day_count(&self) -> DayCountConvention {
        self.day_count
    }

    /// The possibly deferred amount.
    #[must_use]
    pub fn amount(&self) -> &Value {
        &self.value
    }

    /// Forces and returns the accrued amount.
    pub fn value(&self) -> TallyResult<f64> {
        self.value.get()
    }

    /// Year fraction of the whole period under the accrual's own convention.
    pub fn year_fraction(&self) -> TallyResult<f64> {
        self.period.year_fraction(self.day_count)
    }

    /// Year fraction of `period` under this accrual's convention.
    pub fn yf(&self, period: &Period) -> TallyResult<f64> {
        period.year_fraction(self.day_count)
    }

    /// The accrued amount expressed per unit year fraction.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` for unbounded or zero-length periods.
    pub fn rate(&self) -> TallyResult<f64> {
        let yf = self.year_fraction()?;
        if yf == 0.0 {
            return Err(TallyError::range(format!(
                "accrual over {} has no length",
                self.period
            )));
        }
        Ok(self.value()? / yf)
    }

    /// Multiplies the value by `factor`, keeping period and convention.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            period: self.period,
            value: self.value.map(move |v| v * factor),
            day_count: self.day_count,
            sources: self.sources.iter().map(|s| s.scale(factor)).collect(),
        }
    }

    /// Adds two accruals over the identical period and convention.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Alignment` if the periods or conventions differ.
    /// Series-level addition aligns unmatched periods instead.
    pub fn checked_add(&self, other: &Accrual) -> TallyResult<Self> {
        if self.period != other.period {
            return Err(TallyError::alignment(format!(
                "cannot add accruals over {} and {}",
                self.period, other.period
            )));
        }
        if self.day_count != other.day_count {
            return Err(TallyError::alignment(format!(
                "cannot add {} and {} accruals directly",
                self.day_count, other.day_count
            )));
        }
        Self::combine(self.period, self.day_count, [self, other])
    }

    /// Value attributable to `sub`: `value * yf(sub) / yf(period)`.
    ///
    /// Returns the accrual's own value exactly when `sub` is the whole period.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` if `sub` is not inside the accrual period or
    /// the accrual period is unbounded.
    pub fn attributed_value(&self, sub: &Period) -> TallyResult<f64> {
        self.attributed(*sub)?.value()
    }

    /// The part of this accrual falling in `sub`, with the value left lazy.
    pub fn attributed(&self, sub: Period) -> TallyResult<Accrual> {
        if !self.period.contains(&sub) {
            return Err(TallyError::range(format!(
                "{sub} is not within accrual period {}",
                self.period
            )));
        }
        if sub == self.period {
            return Ok(self.clone());
        }
        Self::from_sources(sub, self.day_count, Arc::clone(&self.sources))
    }
}

impl fmt::Display for Accrual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accrual({}, {:?}, {})", self.period, self.value, self.day_count)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// An instantaneous cash movement.
#[derive(Debug, Clone)]
pub struct Payment {
    date: Date,
    value: Value,
}

impl Payment {
    /// Creates a payment.
    pub fn new(date: Date, value: impl Into<Value>) -> Self {
        Self {
            date,
            value: value.into(),
        }
    }

    /// Payment date.
    #[must_use]
    pub fn date(&self) -> Date {
        self.date
    }

    /// The possibly deferred amount.
    #[must_use]
    pub fn amount(&self) -> &Value {
        &self.value
    }

    /// Forces and returns the amount.
    pub fn value(&self) -> TallyResult<f64> {
        self.value.get()
    }

    /// Multiplies the value by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            date: self.date,
            value: self.value.map(move |v| v * factor),
        }
    }

    /// Adds two payments made on the same date.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Alignment` if the dates differ.
    pub fn checked_add(&self, other: &Payment) -> TallyResult<Self> {
        if self.date != other.date {
            return Err(TallyError::alignment(format!(
                "cannot add payments on {} and {}",
                self.date, other.date
            )));
        }
        Ok(Self {
            date: self.date,
            value: Value::sum([self.value.clone(), other.value.clone()]),
        })
    }
}

impl fmt::Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payment({}, {:?})", self.date, self.value)
    }
}

// =============================================================================
// Balance
// =============================================================================

/// A stock level effective as of a date.
///
/// The value may be deferred so that a later balance in a generated sequence
/// can be expressed in terms of an earlier one.
#[derive(Debug, Clone)]
pub struct Balance {
    date: Date,
    value: Value,
}

impl Balance {
    /// Creates a balance.
    pub fn new(date: Date, value: impl Into<Value>) -> Self {
        Self {
            date,
            value: value.into(),
        }
    }

    /// Creates a balance whose value is computed on first read.
    pub fn deferred<F>(date: Date, thunk: F) -> Self
    where
        F: FnOnce() -> TallyResult<f64> + Send + 'static,
    {
        Self::new(date, Value::deferred(thunk))
    }

    /// Effective date.
    #[must_use]
    pub fn date(&self) -> Date {
        self.date
    }

    /// The possibly deferred amount.
    #[must_use]
    pub fn amount(&self) -> &Value {
        &self.value
    }

    /// Forces and returns the balance.
    pub fn value(&self) -> TallyResult<f64> {
        self.value.get()
    }

    /// Multiplies the value by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            date: self.date,
            value: self.value.map(move |v| v * factor),
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Balance({}, {:?})", self.date, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn period(start: Date, end: Date) -> Period {
        Period::new(start, end).unwrap()
    }

    #[test]
    fn test_whole_period_attribution_is_exact() {
        let acc = Accrual::thirty360(period(date(2024, 1, 17), date(2024, 9, 3)), 123.456);
        assert_eq!(acc.attributed_value(&acc.period()).unwrap(), 123.456);
    }

    #[test]
    fn test_complementary_attribution_sums_to_whole() {
        let acc = Accrual::cmonthly(period(date(2024, 1, 1), date(2024, 4, 1)), 90.0);
        let (left, right) = acc.period().split(date(2024, 2, 10)).unwrap();
        let total = acc.attributed_value(&left).unwrap() + acc.attributed_value(&right).unwrap();
        assert_relative_eq!(total, 90.0, epsilon = 1e-12);
    }

    #[test]
    fn test_attribution_outside_period_fails() {
        let acc = Accrual::cmonthly(period(date(2024, 1, 1), date(2024, 4, 1)), 90.0);
        let outside = period(date(2024, 3, 1), date(2024, 5, 1));
        assert!(matches!(
            acc.attributed_value(&outside),
            Err(TallyError::Range { .. })
        ));
    }

    #[test]
    fn test_repeated_cuts_match_a_single_cut() {
        let acc = Accrual::cmonthly(period(date(2024, 1, 1), date(2024, 4, 1)), 90.0);
        let tail = acc.attributed(period(date(2024, 1, 16), date(2024, 4, 1))).unwrap();
        let middle = period(date(2024, 1, 16), date(2024, 2, 16));

        let twice = tail.attributed_value(&middle).unwrap();
        let once = acc.attributed_value(&middle).unwrap();
        assert_relative_eq!(twice, once, epsilon = 1e-12);

        let head = acc.attributed_value(&period(date(2024, 1, 1), date(2024, 1, 16))).unwrap();
        assert_relative_eq!(tail.value().unwrap() + head, 90.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sum_cut_weighs_each_operand_separately() {
        let q1 = period(date(2024, 1, 1), date(2024, 4, 1));
        let a = Accrual::cmonthly(q1, 90.0);
        let b = Accrual::cmonthly(q1, 30.0);
        let sum = a.checked_add(&b).unwrap();
        let february = period(date(2024, 2, 1), date(2024, 3, 1));
        assert_relative_eq!(
            sum.attributed_value(&february).unwrap(),
            a.attributed_value(&february).unwrap() + b.attributed_value(&february).unwrap(),
            epsilon = 1e-12
        );
        let doubled = sum.scale(2.0);
        assert_relative_eq!(doubled.attributed_value(&february).unwrap(), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_attributed_keeps_value_lazy() {
        let acc = Accrual::cmonthly(
            period(date(2024, 1, 1), date(2024, 7, 1)),
            Value::deferred(|| Ok(60.0)),
        );
        let part = acc.attributed(period(date(2024, 1, 1), date(2024, 3, 1))).unwrap();
        assert!(part.amount().is_deferred());
        assert_relative_eq!(part.value().unwrap(), 20.0);
    }

    #[test]
    fn test_scale_and_rate() {
        let acc = Accrual::cmonthly(period(date(2024, 12, 31), date(2025, 3, 31)), 250.0);
        assert_eq!(acc.scale(-2.0).value().unwrap(), -500.0);
        assert_eq!(acc.rate().unwrap(), 1000.0);
    }

    #[test]
    fn test_checked_add_requires_alignment() {
        let q1 = period(date(2024, 1, 1), date(2024, 4, 1));
        let a = Accrual::cmonthly(q1, 1.0);
        let b = Accrual::cmonthly(q1, 2.0);
        assert_eq!(a.checked_add(&b).unwrap().value().unwrap(), 3.0);

        let other_convention = Accrual::thirty360(q1, 2.0);
        assert!(matches!(
            a.checked_add(&other_convention),
            Err(TallyError::Alignment { .. })
        ));

        let shifted = Accrual::cmonthly(period(date(2024, 2, 1), date(2024, 4, 1)), 2.0);
        assert!(matches!(a.checked_add(&shifted), Err(TallyError::Alignment { .. })));
    }

    #[test]
    fn test_payment_add_same_date() {
        let a = Payment::new(date(2024, 3, 31), 5.0);
        let b = Payment::new(date(2024, 3, 31), -2.0);
        assert_eq!(a.checked_add(&b).unwrap().value().unwrap(), 3.0);
        let c = Payment::new(date(2024, 4, 1), 1.0);
        assert!(a.checked_add(&c).is_err());
    }

    #[test]
    fn test_deferred_balance() {
        let bal = Balance::deferred(date(2024, 3, 31), || Ok(1000.0));
        assert!(bal.amount().is_deferred());
        assert_eq!(bal.scale(0.5).value().unwrap(), 500.0);
        assert_eq!(bal.value().unwrap(), 1000.0);
    }
}
