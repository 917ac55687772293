//! Kind-erased series for callers that dispatch queries at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AccrualSeries, BalanceSeries, PaymentSeries};
use crate::error::{TallyError, TallyResult};
use crate::types::Date;

/// The three kinds of series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    /// Amounts earned over periods.
    Accrual,
    /// Instantaneous cash movements.
    Payment,
    /// Stock levels as of dates.
    Balance,
}

impl SeriesKind {
    /// Lowercase name used in messages and output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SeriesKind::Accrual => "accrual",
            SeriesKind::Payment => "payment",
            SeriesKind::Balance => "balance",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A series of any kind.
///
/// Queries that do not apply to the held kind return
/// `TallyError::UndefinedOperation` rather than coercing.
#[derive(Debug, Clone)]
pub enum AnySeries {
    /// An accrual series.
    Accrual(AccrualSeries),
    /// A payment series.
    Payment(PaymentSeries),
    /// A balance series.
    Balance(BalanceSeries),
}

impl AnySeries {
    /// The kind of the held series.
    #[must_use]
    pub fn kind(&self) -> SeriesKind {
        match self {
            AnySeries::Accrual(_) => SeriesKind::Accrual,
            AnySeries::Payment(_) => SeriesKind::Payment,
            AnySeries::Balance(_) => SeriesKind::Balance,
        }
    }

    fn undefined<T>(&self, operation: &str) -> TallyResult<T> {
        Err(TallyError::undefined_operation(operation, self.kind().name()))
    }

    /// Total accrued over `[start, end)`. Accruals only.
    pub fn accrue(&self, start: Date, end: Date) -> TallyResult<f64> {
        match self {
            AnySeries::Accrual(series) => series.accrue(start, end),
            _ => self.undefined("accrue"),
        }
    }

    /// Total paid over `(start, end]`. Payments only.
    pub fn over(&self, start: Date, end: Date) -> TallyResult<f64> {
        match self {
            AnySeries::Payment(series) => series.over(start, end),
            _ => self.undefined("over"),
        }
    }

    /// Balance in effect at `date`. Balances only.
    pub fn at(&self, date: Date) -> TallyResult<f64> {
        match self {
            AnySeries::Balance(series) => series.at(date),
            _ => self.undefined("at"),
        }
    }

    /// Year-fraction weighted average over `[start, end)`. Accruals only.
    pub fn w_avg(&self, start: Date, end: Date) -> TallyResult<f64> {
        match self {
            AnySeries::Accrual(series) => series.w_avg(start, end),
            _ => self.undefined("w_avg"),
        }
    }

    /// The part of the series after `date`.
    #[must_use]
    pub fn after(&self, date: Date) -> AnySeries {
        match self {
            AnySeries::Accrual(series) => AnySeries::Accrual(series.after(date)),
            AnySeries::Payment(series) => AnySeries::Payment(series.after(date)),
            AnySeries::Balance(series) => AnySeries::Balance(series.after(date)),
        }
    }

    /// Multiplies every value by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> AnySeries {
        match self {
            AnySeries::Accrual(series) => AnySeries::Accrual(series.scale(factor)),
            AnySeries::Payment(series) => AnySeries::Payment(series.scale(factor)),
            AnySeries::Balance(series) => AnySeries::Balance(series.scale(factor)),
        }
    }

    /// Negates every value.
    #[must_use]
    pub fn negate(&self) -> AnySeries {
        self.scale(-1.0)
    }

    /// Adds two series of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::UndefinedOperation` if the kinds differ.
    pub fn add(&self, other: &AnySeries) -> TallyResult<AnySeries> {
        match (self, other) {
            (AnySeries::Accrual(a), AnySeries::Accrual(b)) => Ok(AnySeries::Accrual(a.add(b))),
            (AnySeries::Payment(a), AnySeries::Payment(b)) => Ok(AnySeries::Payment(a.add(b))),
            (AnySeries::Balance(a), AnySeries::Balance(b)) => Ok(AnySeries::Balance(a.add(b))),
            _ => Err(TallyError::undefined_operation(
                format!("add {}", other.kind()),
                self.kind().name(),
            )),
        }
    }
}

impl From<AccrualSeries> for AnySeries {
    fn from(series: AccrualSeries) -> Self {
        AnySeries::Accrual(series)
    }
}

impl From<PaymentSeries> for AnySeries {
    fn from(series: PaymentSeries) -> Self {
        AnySeries::Payment(series)
    }
}

impl From<BalanceSeries> for AnySeries {
    fn from(series: BalanceSeries) -> Self {
        AnySeries::Balance(series)
    }
}
