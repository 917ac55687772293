//! Lazy, restartable series of accruals, payments and balances.
//!
//! A [`Series`] is a recipe for a date-ordered sequence rather than the
//! sequence itself. Every call to [`Series::iterate`] starts a fresh traversal
//! and elements are produced only as the consumer pulls them, so unbounded
//! projections are fine as long as queries ask for finite windows.
//!
//! Composition (`+`, `-`, unary `-`, `* k`, [`Series::sum`]) builds new
//! recipes over the operands' own streams without materializing anything.
//!
//! ```rust
//! use tally_core::prelude::*;
//!
//! let start = Date::from_ymd(2024, 1, 1).unwrap();
//! let quarters = Period::series(start, Frequency::Quarterly, DateRoll::SameDay);
//! let revenue = AccrualSeries::generate(move || {
//!     quarters.clone().map(|period| Accrual::cmonthly(period, 100.0))
//! });
//!
//! let costs = revenue.clone() * -0.6;
//! let profit = revenue + costs;
//!
//! let end = Date::from_ymd(2025, 1, 1).unwrap();
//! assert!((profit.accrue(start, end).unwrap() - 160.0).abs() < 1e-9);
//! ```

mod accrual;
mod any;
mod balance;
mod merge;
mod payment;

pub use any::{AnySeries, SeriesKind};

use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

use crate::error::{TallyError, TallyResult};
use crate::primitives::{Accrual, Balance, Payment};

/// A boxed, fallible stream of series elements.
pub type Stream<T> = Box<dyn Iterator<Item = TallyResult<T>> + Send>;

/// A lazy series of accruals.
pub type AccrualSeries = Series<Accrual>;

/// A lazy series of payments.
pub type PaymentSeries = Series<Payment>;

/// A lazy series of balances.
pub type BalanceSeries = Series<Balance>;

/// An element type that can live in a [`Series`].
pub trait Element: Clone + Send + Sync + 'static {
    /// The series kind this element produces.
    const KIND: SeriesKind;

    /// Multiplies the element's value, keeping its date or period.
    fn scale(&self, factor: f64) -> Self;

    /// Merges several date-ordered streams into one date-ordered stream,
    /// adding values that line up.
    fn merge(streams: Vec<Stream<Self>>) -> Stream<Self>;

    /// Checks that `next` may follow `previous` in a series.
    fn check_order(previous: &Self, next: &Self) -> TallyResult<()>;
}

/// A lazily produced, date-ordered sequence of [`Element`]s.
pub struct Series<T> {
    source: Arc<dyn Fn() -> Stream<T> + Send + Sync>,
}

impl<T> Clone for Series<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T> std::fmt::Debug for Series<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Series").finish_non_exhaustive()
    }
}

impl<T: Element> Series<T> {
    /// A series whose traversals are produced by `source`.
    pub fn from_fn<F, I>(source: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = TallyResult<T>> + Send + 'static,
    {
        Self {
            source: Arc::new(move || Box::new(source()) as Stream<T>),
        }
    }

    /// A series over an infallible element iterator.
    pub fn generate<F, I>(source: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = T> + Send + 'static,
    {
        Self::from_fn(move || source().map(Ok))
    }

    /// A finite series of literal elements, typically historical facts.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Range` if the elements are out of order or overlap.
    pub fn literal(items: Vec<T>) -> TallyResult<Self> {
        for pair in items.windows(2) {
            T::check_order(&pair[0], &pair[1])?;
        }
        let items: Arc<[T]> = items.into();
        Ok(Self::from_fn(move || {
            let items = Arc::clone(&items);
            (0..items.len()).map(move |i| Ok(items[i].clone()))
        }))
    }

    /// A series with no elements.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_fn(std::iter::empty::<TallyResult<T>>)
    }

    /// A series generated by threading `state` through `step`.
    ///
    /// `step` receives the current state and returns the next element together
    /// with the following state, or `None` to end the series. Each traversal
    /// starts again from a clone of the initial state.
    pub fn unfold<S, F>(state: S, step: F) -> Self
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(&S) -> TallyResult<Option<(T, S)>> + Send + Sync + 'static,
    {
        let step: StepFn<S, T> = Arc::new(step);
        Self::from_fn(move || Unfold {
            state: Some(state.clone()),
            step: Arc::clone(&step),
        })
    }

    /// Starts a fresh traversal.
    #[must_use]
    pub fn iterate(&self) -> Stream<T> {
        (self.source)()
    }

    /// Materializes the first `n` elements.
    pub fn take(&self, n: usize) -> TallyResult<Vec<T>> {
        self.iterate().take(n).collect()
    }

    /// The first element, if any.
    pub fn first(&self) -> TallyResult<Option<T>> {
        self.iterate().next().transpose()
    }

    /// Multiplies every value by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        let base = self.clone();
        Self::from_fn(move || base.iterate().map(move |item| item.map(|e| e.scale(factor))))
    }

    /// Negates every value.
    #[must_use]
    pub fn negate(&self) -> Self {
        self.scale(-1.0)
    }

    /// Adds two series on a merged timeline.
    #[must_use]
    pub fn add(&self, other: &Series<T>) -> Self {
        Self::sum([self.clone(), other.clone()])
    }

    /// Sums any number of series in a single k-way merge.
    ///
    /// The result does not depend on the order of the operands.
    pub fn sum<I>(series: I) -> Self
    where
        I: IntoIterator<Item = Series<T>>,
    {
        let operands: Vec<Series<T>> = series.into_iter().collect();
        match operands.len() {
            0 => Self::empty(),
            1 => operands[0].clone(),
            _ => Self::from_fn(move || T::merge(operands.iter().map(Series::iterate).collect())),
        }
    }

    /// Yields every element of this series, then continues with the series
    /// that `continuation` builds from the last element.
    ///
    /// This is how a projection picks up where its history ends.
    ///
    /// # Errors
    ///
    /// Traversal yields `TallyError::Range` if this series is empty.
    pub fn then<F>(&self, continuation: F) -> Self
    where
        F: Fn(&T) -> Series<T> + Send + Sync + 'static,
    {
        let head = self.clone();
        let continuation: Arc<dyn Fn(&T) -> Series<T> + Send + Sync> = Arc::new(continuation);
        Self::from_fn(move || Then {
            head: Some(head.iterate()),
            last: None,
            tail: None,
            continuation: Arc::clone(&continuation),
            finished: false,
        })
    }

    /// Maps each element to an element of another series type.
    ///
    /// The mapping must preserve date order.
    pub fn map_into<U, F>(&self, f: F) -> Series<U>
    where
        U: Element,
        F: Fn(T) -> TallyResult<U> + Send + Sync + 'static,
    {
        let base = self.clone();
        let f = Arc::new(f);
        Series::from_fn(move || {
            let f = Arc::clone(&f);
            base.iterate().map(move |item| item.and_then(|e| (*f)(e)))
        })
    }
}

type StepFn<S, T> = Arc<dyn Fn(&S) -> TallyResult<Option<(T, S)>> + Send + Sync>;

struct Unfold<S, T> {
    state: Option<S>,
    step: StepFn<S, T>,
}

impl<S, T> Iterator for Unfold<S, T> {
    type Item = TallyResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let state = self.state.take()?;
        match (self.step)(&state) {
            Ok(Some((item, next))) => {
                self.state = Some(next);
                Some(Ok(item))
            }
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

struct Then<T> {
    head: Option<Stream<T>>,
    last: Option<T>,
    tail: Option<Stream<T>>,
    continuation: Arc<dyn Fn(&T) -> Series<T> + Send + Sync>,
    finished: bool,
}

impl<T: Element> Iterator for Then<T> {
    type Item = TallyResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(head) = self.head.as_mut() {
            match head.next() {
                Some(Ok(item)) => {
                    self.last = Some(item.clone());
                    return Some(Ok(item));
                }
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(Err(err));
                }
                None => {
                    self.head = None;
                    let Some(last) = self.last.take() else {
                        self.finished = true;
                        return Some(Err(TallyError::range(
                            "cannot continue a series with no elements",
                        )));
                    };
                    self.tail = Some((self.continuation)(&last).iterate());
                }
            }
        }
        self.tail.as_mut()?.next()
    }
}

// =============================================================================
// Operators
// =============================================================================

impl<T: Element> Add for Series<T> {
    type Output = Series<T>;

    fn add(self, rhs: Series<T>) -> Series<T> {
        Series::sum([self, rhs])
    }
}

impl<T: Element> Sub for Series<T> {
    type Output = Series<T>;

    fn sub(self, rhs: Series<T>) -> Series<T> {
        Series::sum([self, rhs.negate()])
    }
}

impl<T: Element> Neg for Series<T> {
    type Output = Series<T>;

    fn neg(self) -> Series<T> {
        self.negate()
    }
}

impl<T: Element> Mul<f64> for Series<T> {
    type Output = Series<T>;

    fn mul(self, factor: f64) -> Series<T> {
        self.scale(factor)
    }
}

impl<T: Element> std::iter::Sum for Series<T> {
    fn sum<I: Iterator<Item = Series<T>>>(iter: I) -> Self {
        Series::sum(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Date;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn payments(points: &[(Date, f64)]) -> PaymentSeries {
        PaymentSeries::literal(points.iter().map(|(d, v)| Payment::new(*d, *v)).collect())
            .unwrap()
    }

    #[test]
    fn test_iterate_is_restartable() {
        let series = payments(&[(date(2024, 1, 1), 1.0), (date(2024, 2, 1), 2.0)]);
        assert_eq!(series.take(5).unwrap().len(), 2);
        assert_eq!(series.take(5).unwrap().len(), 2);
        assert_eq!(series.first().unwrap().unwrap().value().unwrap(), 1.0);
    }

    #[test]
    fn test_literal_rejects_disorder() {
        let result = PaymentSeries::literal(vec![
            Payment::new(date(2024, 2, 1), 1.0),
            Payment::new(date(2024, 1, 1), 1.0),
        ]);
        assert!(matches!(result, Err(TallyError::Range { .. })));
    }

    #[test]
    fn test_unbounded_prefix_is_lazy() {
        let start = date(2024, 1, 1);
        let series = PaymentSeries::unfold(start, |d| {
            let next = d.add_months(1)?;
            Ok(Some((Payment::new(next, 1.0), next)))
        });
        let prefix = series.take(3).unwrap();
        assert_eq!(prefix[2].date(), date(2024, 4, 1));
    }

    #[test]
    fn test_then_continues_from_last() {
        let history = payments(&[(date(2024, 1, 31), 10.0), (date(2024, 2, 29), 11.0)]);
        let projected = history.then(|last| {
            let last = last.clone();
            PaymentSeries::unfold(last, |p| {
                let next = Payment::new(p.date().add_months_to_month_end(1)?, p.value()? + 1.0);
                Ok(Some((next.clone(), next)))
            })
        });
        let items = projected.take(4).unwrap();
        assert_eq!(items[2].date(), date(2024, 3, 31));
        assert_eq!(items[3].value().unwrap(), 13.0);
    }

    #[test]
    fn test_then_on_empty_fails() {
        let projected = PaymentSeries::empty().then(|_| PaymentSeries::empty());
        assert!(matches!(projected.first(), Err(TallyError::Range { .. })));
    }

    #[test]
    fn test_operators() {
        let a = payments(&[(date(2024, 1, 1), 5.0)]);
        let b = payments(&[(date(2024, 1, 1), 3.0)]);
        let diff = (a.clone() - b.clone()).take(1).unwrap();
        assert_eq!(diff[0].value().unwrap(), 2.0);
        let neg = (-a.clone()).take(1).unwrap();
        assert_eq!(neg[0].value().unwrap(), -5.0);
        let total: PaymentSeries = vec![a.clone(), b, a * 2.0].into_iter().sum();
        assert_eq!(total.take(1).unwrap()[0].value().unwrap(), 18.0);
    }
}
