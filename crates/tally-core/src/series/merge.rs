//! K-way merges behind series summation.
//!
//! Each merge pulls at most one element ahead from every operand, which keeps
//! summation lazy enough for series that read each other's earlier elements.

use super::Stream;
use crate::daycounts::DayCountConvention;
use crate::error::TallyResult;
use crate::primitives::{Accrual, Balance, Payment};
use crate::types::{Date, Period};
use crate::value::Value;

/// One operand of a merge with a single element of lookahead.
struct Cursor<T> {
    stream: Stream<T>,
    head: Option<T>,
    exhausted: bool,
}

impl<T> Cursor<T> {
    fn new(stream: Stream<T>) -> Self {
        Self {
            stream,
            head: None,
            exhausted: false,
        }
    }

    /// Loads the next element if the head is empty and returns the head.
    fn peek(&mut self) -> TallyResult<Option<&T>> {
        if self.head.is_none() && !self.exhausted {
            match self.stream.next() {
                Some(Ok(item)) => self.head = Some(item),
                Some(Err(err)) => {
                    self.exhausted = true;
                    return Err(err);
                }
                None => self.exhausted = true,
            }
        }
        Ok(self.head.as_ref())
    }

    fn pop(&mut self) -> Option<T> {
        self.head.take()
    }
}

/// Wraps a fallible step function into a stream that stops after an error.
struct Merge<S> {
    state: S,
    failed: bool,
}

trait MergeStep {
    type Item;

    fn step(&mut self) -> TallyResult<Option<Self::Item>>;
}

impl<S: MergeStep> Iterator for Merge<S> {
    type Item = TallyResult<S::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.state.step() {
            Ok(item) => item.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn cursors<T>(streams: Vec<Stream<T>>) -> Vec<Cursor<T>> {
    streams.into_iter().map(Cursor::new).collect()
}

// =============================================================================
// Accruals
// =============================================================================

/// Merges accrual streams on the union of their period boundaries.
///
/// Every emitted segment lies between two consecutive boundaries. Operands
/// covering the segment contribute their pro-rata share; operands that do not
/// cover it contribute nothing. Stretches covered by no operand are skipped.
/// Segments carry their operands' sources, so merging merged series cuts
/// every original accrual the same way however the operands were grouped.
pub(crate) fn merge_accruals(streams: Vec<Stream<Accrual>>) -> Stream<Accrual> {
    Box::new(Merge {
        state: AccrualMerge {
            cursors: cursors(streams),
            frontier: None,
        },
        failed: false,
    })
}

struct AccrualMerge {
    cursors: Vec<Cursor<Accrual>>,
    frontier: Option<Date>,
}

impl MergeStep for AccrualMerge {
    type Item = Accrual;

    fn step(&mut self) -> TallyResult<Option<Accrual>> {
        let floor = self.frontier.unwrap_or(Date::MIN);

        for cursor in &mut self.cursors {
            while let Some(head) = cursor.peek()? {
                if head.end() > floor && !head.period().is_empty() {
                    break;
                }
                cursor.pop();
            }
        }

        let heads: Vec<&Accrual> = self.cursors.iter().filter_map(|c| c.head.as_ref()).collect();
        let Some(start) = heads.iter().map(|h| h.start().max(floor)).min() else {
            return Ok(None);
        };
        let end = heads
            .iter()
            .flat_map(|h| [h.start(), h.end()])
            .filter(|boundary| *boundary > start)
            .min()
            .unwrap_or(Date::MAX);
        let segment = Period::new(start, end)?;

        let covering: Vec<&Accrual> = heads.into_iter().filter(|h| h.start() <= start).collect();
        let day_count = covering
            .iter()
            .map(|h| h.day_count())
            .min()
            .unwrap_or(DayCountConvention::CalendarMonthly);
        let parts = covering
            .iter()
            .map(|h| h.attributed(segment))
            .collect::<TallyResult<Vec<Accrual>>>()?;
        let merged = Accrual::combine(segment, day_count, &parts)?;

        self.frontier = Some(end);
        Ok(Some(merged))
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Merges payment streams by date, adding payments on the same date.
pub(crate) fn merge_payments(streams: Vec<Stream<Payment>>) -> Stream<Payment> {
    Box::new(Merge {
        state: PaymentMerge {
            cursors: cursors(streams),
        },
        failed: false,
    })
}

struct PaymentMerge {
    cursors: Vec<Cursor<Payment>>,
}

impl MergeStep for PaymentMerge {
    type Item = Payment;

    fn step(&mut self) -> TallyResult<Option<Payment>> {
        let mut date: Option<Date> = None;
        for cursor in &mut self.cursors {
            if let Some(head) = cursor.peek()? {
                date = Some(date.map_or(head.date(), |d| d.min(head.date())));
            }
        }
        let Some(date) = date else {
            return Ok(None);
        };

        let mut parts = Vec::new();
        for cursor in &mut self.cursors {
            while cursor.peek()?.is_some_and(|head| head.date() == date) {
                if let Some(payment) = cursor.pop() {
                    parts.push(payment.amount().clone());
                }
            }
        }
        Ok(Some(Payment::new(date, Value::sum(parts))))
    }
}

// =============================================================================
// Balances
// =============================================================================

/// Merges balance streams with step semantics.
///
/// At every date present in any operand, each operand contributes its latest
/// balance on or before that date. An operand that has not started yet
/// contributes zero, and an exhausted operand keeps its last balance.
pub(crate) fn merge_balances(streams: Vec<Stream<Balance>>) -> Stream<Balance> {
    let latest = vec![None; streams.len()];
    Box::new(Merge {
        state: BalanceMerge {
            cursors: cursors(streams),
            latest,
        },
        failed: false,
    })
}

struct BalanceMerge {
    cursors: Vec<Cursor<Balance>>,
    latest: Vec<Option<Value>>,
}

impl MergeStep for BalanceMerge {
    type Item = Balance;

    fn step(&mut self) -> TallyResult<Option<Balance>> {
        let mut date: Option<Date> = None;
        for cursor in &mut self.cursors {
            if let Some(head) = cursor.peek()? {
                date = Some(date.map_or(head.date(), |d| d.min(head.date())));
            }
        }
        let Some(date) = date else {
            return Ok(None);
        };

        for (cursor, latest) in self.cursors.iter_mut().zip(self.latest.iter_mut()) {
            while cursor.peek()?.is_some_and(|head| head.date() == date) {
                if let Some(balance) = cursor.pop() {
                    *latest = Some(balance.amount().clone());
                }
            }
        }
        let value = Value::sum(self.latest.iter().flatten().cloned());
        Ok(Some(Balance::new(date, value)))
    }
}
