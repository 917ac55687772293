//! Accrual series queries.

use super::merge::merge_accruals;
use super::{AccrualSeries, Element, PaymentSeries, SeriesKind, Stream};
use crate::error::{TallyError, TallyResult};
use crate::primitives::{Accrual, Payment};
use crate::types::{Date, Period};

impl Element for Accrual {
    const KIND: SeriesKind = SeriesKind::Accrual;

    fn scale(&self, factor: f64) -> Self {
        Accrual::scale(self, factor)
    }

    fn merge(streams: Vec<Stream<Self>>) -> Stream<Self> {
        merge_accruals(streams)
    }

    fn check_order(previous: &Self, next: &Self) -> TallyResult<()> {
        if next.start() < previous.end() {
            return Err(TallyError::range(format!(
                "accrual {} overlaps preceding {}",
                next.period(),
                previous.period()
            )));
        }
        Ok(())
    }
}

fn window(start: Date, end: Date) -> TallyResult<Period> {
    Period::new(start, end)
        .map_err(|_| TallyError::range(format!("window end {end} precedes start {start}")))
}

impl AccrualSeries {
    /// Sum of the values attributable to `[start, end)`.
    ///
    /// Accruals crossing either boundary contribute their pro-rata share.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` if `end < start`, and propagates any error
    /// raised while producing or forcing the accruals involved.
    pub fn accrue(&self, start: Date, end: Date) -> TallyResult<f64> {
        let window = window(start, end)?;
        if window.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for item in self.iterate() {
            let accrual = item?;
            if accrual.start() >= end {
                break;
            }
            if let Some(overlap) = accrual.period().intersection(&window) {
                total += accrual.attributed_value(&overlap)?;
            }
        }
        Ok(total)
    }

    /// Day-count weighted average of the accrual values over `[start, end)`.
    ///
    /// Used for rate schedules, where each accrual's value is an annual rate
    /// in force over its period. Open-ended terminal periods are allowed.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` if the window is reversed or no accrual
    /// covers any part of it.
    pub fn w_avg(&self, start: Date, end: Date) -> TallyResult<f64> {
        let window = window(start, end)?;

        let mut weighted = 0.0;
        let mut weights = 0.0;
        for item in self.iterate() {
            let accrual = item?;
            if accrual.start() >= end {
                break;
            }
            if let Some(overlap) = accrual.period().intersection(&window) {
                let weight = accrual.yf(&overlap)?;
                weighted += accrual.value()? * weight;
                weights += weight;
            }
        }

        if weights == 0.0 {
            return Err(TallyError::range(format!(
                "no accruals cover {window} for a weighted average"
            )));
        }
        Ok(weighted / weights)
    }

    /// The part of the series strictly after `date`.
    ///
    /// An accrual straddling `date` is cut and only its tail is kept.
    #[must_use]
    pub fn after(&self, date: Date) -> AccrualSeries {
        let base = self.clone();
        AccrualSeries::from_fn(move || {
            base.iterate().filter_map(move |item| match item {
                Err(err) => Some(Err(err)),
                Ok(accrual) if accrual.end() <= date => None,
                Ok(accrual) if accrual.start() >= date => Some(Ok(accrual)),
                Ok(accrual) => Some(
                    Period::new(date, accrual.end()).and_then(|tail| accrual.attributed(tail)),
                ),
            })
        })
    }

    /// Settles every accrual as a payment on its period end.
    #[must_use]
    pub fn to_payments(&self) -> PaymentSeries {
        self.map_into(|accrual| Ok(Payment::new(accrual.end(), accrual.amount().clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daycounts::DayCountConvention;
    use crate::types::{DateRoll, Frequency};
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn quarterly(start: Date, values: &[f64]) -> AccrualSeries {
        let periods = Period::series(start, Frequency::Quarterly, DateRoll::MonthEnd);
        AccrualSeries::literal(
            periods
                .zip(values.iter())
                .map(|(p, v)| Accrual::cmonthly(p, *v))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_accrue_whole_and_partial() {
        let series = quarterly(date(2024, 12, 31), &[100.0, 200.0]);
        assert_eq!(series.accrue(date(2024, 12, 31), date(2025, 3, 31)).unwrap(), 100.0);
        assert_eq!(series.accrue(date(2024, 12, 31), date(2025, 6, 30)).unwrap(), 300.0);
        // One month of each quarter
        let straddle = series.accrue(date(2025, 2, 28), date(2025, 4, 30)).unwrap();
        assert_relative_eq!(straddle, 100.0 / 3.0 + 200.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_accrue_edges() {
        let series = quarterly(date(2024, 12, 31), &[100.0]);
        assert_eq!(series.accrue(date(2025, 1, 15), date(2025, 1, 15)).unwrap(), 0.0);
        assert_eq!(series.accrue(date(2026, 1, 1), date(2027, 1, 1)).unwrap(), 0.0);
        assert!(matches!(
            series.accrue(date(2025, 3, 1), date(2025, 1, 1)),
            Err(TallyError::Range { .. })
        ));
    }

    #[test]
    fn test_w_avg_blends_rates() {
        let rates = AccrualSeries::literal(vec![
            Accrual::cmonthly(Period::new(date(2025, 1, 1), date(2025, 7, 1)).unwrap(), 0.10),
            Accrual::cmonthly(Period::open(date(2025, 7, 1)), 0.04),
        ])
        .unwrap();
        let blended = rates.w_avg(date(2025, 4, 1), date(2025, 10, 1)).unwrap();
        assert_relative_eq!(blended, 0.07, epsilon = 1e-12);
        assert_relative_eq!(rates.w_avg(date(2031, 1, 1), date(2032, 1, 1)).unwrap(), 0.04);
        assert!(rates.w_avg(date(2024, 1, 1), date(2024, 6, 1)).is_err());
    }

    #[test]
    fn test_after_cuts_straddling_accrual() {
        let series = quarterly(date(2024, 12, 31), &[90.0, 90.0]);
        let tail = series.after(date(2025, 2, 28)).take(10).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].start(), date(2025, 2, 28));
        assert_relative_eq!(tail[0].value().unwrap(), 30.0, epsilon = 1e-9);
        assert_eq!(tail[1].value().unwrap(), 90.0);

        let exact = series.after(date(2025, 3, 31)).take(10).unwrap();
        assert_eq!(exact.len(), 1);
    }

    #[test]
    fn test_sum_aligns_unmatched_periods() {
        let quarters = quarterly(date(2024, 12, 31), &[30.0, 30.0]);
        let half = AccrualSeries::literal(vec![Accrual::new(
            Period::new(date(2025, 1, 31), date(2025, 5, 31)).unwrap(),
            40.0,
            DayCountConvention::Thirty360,
        )])
        .unwrap();

        let total = quarters.clone() + half.clone();
        let segments = total.take(10).unwrap();
        let bounds: Vec<Date> = segments.iter().map(Accrual::start).collect();
        assert_eq!(
            bounds,
            vec![date(2024, 12, 31), date(2025, 1, 31), date(2025, 3, 31), date(2025, 5, 31)]
        );
        assert_eq!(segments[1].day_count(), DayCountConvention::CalendarMonthly);

        let whole = total.accrue(date(2024, 12, 31), date(2025, 6, 30)).unwrap();
        assert_relative_eq!(whole, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_to_payments() {
        let series = quarterly(date(2024, 12, 31), &[10.0, 20.0]);
        let payments = series.to_payments();
        assert_eq!(payments.over(date(2024, 12, 31), date(2025, 6, 30)).unwrap(), 30.0);
        assert_eq!(payments.over(date(2025, 3, 31), date(2025, 6, 30)).unwrap(), 20.0);
    }
}
