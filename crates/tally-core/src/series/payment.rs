//! Payment series queries.

use super::merge::merge_payments;
use super::{Element, PaymentSeries, SeriesKind, Stream};
use crate::error::{TallyError, TallyResult};
use crate::primitives::Payment;
use crate::types::Date;

impl Element for Payment {
    const KIND: SeriesKind = SeriesKind::Payment;

    fn scale(&self, factor: f64) -> Self {
        Payment::scale(self, factor)
    }

    fn merge(streams: Vec<Stream<Self>>) -> Stream<Self> {
        merge_payments(streams)
    }

    fn check_order(previous: &Self, next: &Self) -> TallyResult<()> {
        if next.date() < previous.date() {
            return Err(TallyError::range(format!(
                "payment on {} precedes payment on {}",
                next.date(),
                previous.date()
            )));
        }
        Ok(())
    }
}

impl PaymentSeries {
    /// Sum of payments dated in `(start, end]`.
    ///
    /// The left boundary is excluded so that adjacent windows never count the
    /// same payment twice.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` if `end < start`.
    pub fn over(&self, start: Date, end: Date) -> TallyResult<f64> {
        if end < start {
            return Err(TallyError::range(format!(
                "window end {end} precedes start {start}"
            )));
        }

        let mut total = 0.0;
        for item in self.iterate() {
            let payment = item?;
            if payment.date() > end {
                break;
            }
            if payment.date() > start {
                total += payment.value()?;
            }
        }
        Ok(total)
    }

    /// Payments dated strictly after `date`.
    #[must_use]
    pub fn after(&self, date: Date) -> PaymentSeries {
        let base = self.clone();
        PaymentSeries::from_fn(move || {
            base.iterate()
                .filter(move |item| item.as_ref().map_or(true, |p| p.date() > date))
        })
    }
}
