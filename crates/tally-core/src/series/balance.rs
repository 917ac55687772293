//! Balance series queries and recurrences.

use super::merge::merge_balances;
use super::{BalanceSeries, Element, PaymentSeries, SeriesKind, Stream};
use crate::error::{TallyError, TallyResult};
use crate::primitives::{Balance, Payment};
use crate::types::Date;

impl Element for Balance {
    const KIND: SeriesKind = SeriesKind::Balance;

    fn scale(&self, factor: f64) -> Self {
        Balance::scale(self, factor)
    }

    fn merge(streams: Vec<Stream<Self>>) -> Stream<Self> {
        merge_balances(streams)
    }

    fn check_order(previous: &Self, next: &Self) -> TallyResult<()> {
        if next.date() < previous.date() {
            return Err(TallyError::range(format!(
                "balance on {} precedes balance on {}",
                next.date(),
                previous.date()
            )));
        }
        Ok(())
    }
}

impl BalanceSeries {
    /// The last balance dated on or before `date`.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` if `date` precedes the first balance.
    pub fn balance_at(&self, date: Date) -> TallyResult<Balance> {
        let mut found = None;
        for item in self.iterate() {
            let balance = item?;
            if balance.date() > date {
                break;
            }
            found = Some(balance);
        }
        found.ok_or_else(|| TallyError::range(format!("no balance on or before {date}")))
    }

    /// Value of the balance in effect at `date` (step function semantics).
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` if `date` precedes the first balance.
    pub fn at(&self, date: Date) -> TallyResult<f64> {
        self.balance_at(date)?.value()
    }

    /// Balances dated strictly after `date`.
    #[must_use]
    pub fn after(&self, date: Date) -> BalanceSeries {
        let base = self.clone();
        BalanceSeries::from_fn(move || {
            base.iterate()
                .filter(move |item| item.as_ref().map_or(true, |b| b.date() > date))
        })
    }

    /// Differences between consecutive balances, dated at the later balance.
    #[must_use]
    pub fn changes(&self) -> PaymentSeries {
        let base = self.clone();
        PaymentSeries::from_fn(move || Changes {
            balances: base.iterate(),
            previous: None,
        })
    }

    /// Rolls `opening` forward by each flow: `b[t] = b[t - 1] + flow[t]`.
    ///
    /// The opening balance itself is not emitted. Every emitted value is
    /// deferred, so element dates are known before any amount is computed.
    #[must_use]
    pub fn accumulate(opening: Balance, flows: PaymentSeries) -> BalanceSeries {
        BalanceSeries::from_fn(move || {
            let mut previous = opening.clone();
            flows.iterate().map(move |flow| {
                let flow = flow?;
                let value = previous
                    .amount()
                    .zip_with(flow.amount(), |balance, change| balance + change);
                previous = Balance::new(flow.date(), value);
                Ok(previous.clone())
            })
        })
    }
}

struct Changes {
    balances: Stream<Balance>,
    previous: Option<Balance>,
}

impl Iterator for Changes {
    type Item = TallyResult<Payment>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = match self.balances.next()? {
                Ok(balance) => balance,
                Err(err) => return Some(Err(err)),
            };
            let Some(previous) = self.previous.replace(current.clone()) else {
                continue;
            };
            let change = current
                .amount()
                .zip_with(previous.amount(), |later, earlier| later - earlier);
            return Some(Ok(Payment::new(current.date(), change)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn series(points: &[(Date, f64)]) -> BalanceSeries {
        BalanceSeries::literal(points.iter().map(|(d, v)| Balance::new(*d, *v)).collect())
            .unwrap()
    }

    #[test]
    fn test_step_semantics() {
        let balances = series(&[(date(2025, 3, 31), 100.0), (date(2025, 6, 30), 150.0)]);
        assert_eq!(balances.at(date(2025, 3, 31)).unwrap(), 100.0);
        assert_eq!(balances.at(date(2025, 6, 29)).unwrap(), 100.0);
        assert_eq!(balances.at(date(2025, 6, 30)).unwrap(), 150.0);
        assert_eq!(balances.at(date(2030, 1, 1)).unwrap(), 150.0);
        assert!(matches!(
            balances.at(date(2025, 3, 30)),
            Err(TallyError::Range { .. })
        ));
    }

    #[test]
    fn test_sum_carries_balances_forward() {
        let a = series(&[(date(2025, 1, 31), 10.0), (date(2025, 3, 31), 30.0)]);
        let b = series(&[(date(2025, 2, 28), 5.0)]);
        let total = a + b;
        assert_eq!(total.at(date(2025, 1, 31)).unwrap(), 10.0);
        assert_eq!(total.at(date(2025, 2, 28)).unwrap(), 15.0);
        assert_eq!(total.at(date(2025, 3, 31)).unwrap(), 35.0);
    }

    #[test]
    fn test_changes() {
        let balances = series(&[
            (date(2025, 3, 31), 100.0),
            (date(2025, 6, 30), 150.0),
            (date(2025, 9, 30), 120.0),
        ]);
        let changes = balances.changes().take(5).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].date(), date(2025, 6, 30));
        assert_eq!(changes[0].value().unwrap(), 50.0);
        assert_eq!(changes[1].value().unwrap(), -30.0);
    }

    #[test]
    fn test_accumulate_draws_on_base() {
        let forced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&forced);
        let base = Balance::new(
            date(2025, 1, 1),
            Value::deferred(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(1000.0)
            }),
        );
        let draws = PaymentSeries::literal(vec![
            Payment::new(date(2025, 2, 1), 50.0),
            Payment::new(date(2025, 3, 1), -20.0),
        ])
        .unwrap();

        let history = BalanceSeries::literal(vec![base]).unwrap();
        let balances = history.then(move |last| {
            BalanceSeries::accumulate(last.clone(), draws.after(last.date()))
        });

        let items = balances.take(3).unwrap();
        assert!(items[2].amount().is_deferred());
        assert_eq!(items[1].value().unwrap(), 1050.0);
        assert_eq!(items[2].value().unwrap(), 1030.0);
        assert_eq!(items[0].value().unwrap(), 1000.0);
        assert_eq!(forced.load(Ordering::SeqCst), 1);
    }
}
