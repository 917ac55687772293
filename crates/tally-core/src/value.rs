//! Ready and deferred numeric values.
//!
//! A [`Value`] is either a number or a closure that produces one on first
//! read. Deferred values let a recurrence such as
//! `balance[t] = balance[t - 1] + flow[t]` emit element `t` with a known date
//! before its amount has been computed.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::error::{TallyError, TallyResult};

type Thunk = Box<dyn FnOnce() -> TallyResult<f64> + Send>;

enum State {
    Pending(Thunk),
    Forcing(ThreadId),
    Done(TallyResult<f64>),
}

struct Deferred {
    state: Mutex<State>,
    done: Condvar,
}

impl Deferred {
    fn force(&self) -> TallyResult<f64> {
        let me = thread::current().id();
        let thunk = {
            let mut state = self.state.lock();
            loop {
                match std::mem::replace(&mut *state, State::Forcing(me)) {
                    State::Pending(thunk) => break thunk,
                    State::Done(result) => {
                        *state = State::Done(result.clone());
                        return result;
                    }
                    State::Forcing(owner) => {
                        *state = State::Forcing(owner);
                        if owner == me {
                            tracing::trace!("deferred value re-entered while forcing");
                            return Err(TallyError::unbounded_recursion(
                                "a deferred value that depends on itself",
                            ));
                        }
                        self.done.wait(&mut state);
                    }
                }
            }
        };

        // The lock is released while the thunk runs so that it may force other values.
        let publish = Publish {
            deferred: self,
            result: None,
        };
        publish.finish(thunk())
    }

    fn peek(&self) -> Option<f64> {
        match &*self.state.try_lock()? {
            State::Done(Ok(value)) => Some(*value),
            _ => None,
        }
    }
}

/// Stores the outcome of a forcing and wakes waiting threads, even when the
/// thunk unwinds.
struct Publish<'a> {
    deferred: &'a Deferred,
    result: Option<TallyResult<f64>>,
}

impl Publish<'_> {
    fn finish(mut self, result: TallyResult<f64>) -> TallyResult<f64> {
        self.result = Some(result.clone());
        result
    }
}

impl Drop for Publish<'_> {
    fn drop(&mut self) {
        let result = self.result.take().unwrap_or_else(|| {
            Err(TallyError::range("a deferred value panicked while being computed"))
        });
        *self.deferred.state.lock() = State::Done(result);
        self.deferred.done.notify_all();
    }
}


/// A number that may be computed lazily.
///
/// Clones share the same deferred state, so a deferred value is forced at most
/// once no matter how many accruals, payments or balances hold it.
///
/// # Example
///
/// ```rust
/// use tally_core::Value;
///
/// let base = Value::ready(1000.0);
/// let draw = Value::deferred(|| Ok(50.0));
/// let balance = base.zip_with(&draw, |b, d| b + d);
/// assert_eq!(balance.get().unwrap(), 1050.0);
/// ```
#[derive(Clone)]
pub struct Value(Repr);

#[derive(Clone)]
enum Repr {
    Ready(f64),
    Deferred(Arc<Deferred>),
}

impl Value {
    /// A value that is already known.
    #[must_use]
    pub fn ready(value: f64) -> Self {
        Self(Repr::Ready(value))
    }

    /// A value computed by `thunk` on first read.
    pub fn deferred<F>(thunk: F) -> Self
    where
        F: FnOnce() -> TallyResult<f64> + Send + 'static,
    {
        Self(Repr::Deferred(Arc::new(Deferred {
            state: Mutex::new(State::Pending(Box::new(thunk))),
            done: Condvar::new(),
        })))
    }

    /// Reads the value, forcing it if it is deferred.
    ///
    /// # Errors
    ///
    /// Propagates the thunk's error, or returns `TallyError::UnboundedRecursion`
    /// if the value is read again by the thread computing it. Other threads
    /// block until the computing thread has stored the result.
    pub fn get(&self) -> TallyResult<f64> {
        match &self.0 {
            Repr::Ready(value) => Ok(*value),
            Repr::Deferred(deferred) => deferred.force(),
        }
    }

    /// Returns the number if it is known without forcing anything.
    #[must_use]
    pub fn peek(&self) -> Option<f64> {
        match &self.0 {
            Repr::Ready(value) => Some(*value),
            Repr::Deferred(deferred) => deferred.peek(),
        }
    }

    /// True if reading this value may run a closure.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self.0, Repr::Deferred(_))
    }

    /// Applies `f` to the value, lazily if the value is deferred.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: FnOnce(f64) -> f64 + Send + 'static,
    {
        match &self.0 {
            Repr::Ready(value) => Self::ready(f(*value)),
            Repr::Deferred(_) => {
                let source = self.clone();
                Self::deferred(move || Ok(f(source.get()?)))
            }
        }
    }

    /// Combines two values, lazily unless both are ready.
    pub fn zip_with<F>(&self, other: &Value, f: F) -> Self
    where
        F: FnOnce(f64, f64) -> f64 + Send + 'static,
    {
        match (&self.0, &other.0) {
            (Repr::Ready(a), Repr::Ready(b)) => Self::ready(f(*a, *b)),
            _ => {
                let (left, right) = (self.clone(), other.clone());
                Self::deferred(move || Ok(f(left.get()?, right.get()?)))
            }
        }
    }

    /// Sums a collection of values.
    ///
    /// Terms are added in ascending order, so the result does not depend on the
    /// order in which the values were supplied.
    pub fn sum<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<Value> = values.into_iter().collect();
        if values.iter().all(|v| !v.is_deferred()) {
            let terms: Vec<f64> = values.iter().filter_map(Value::peek).collect();
            return Self::ready(ordered_sum(terms));
        }
        Self::deferred(move || {
            let terms = values
                .iter()
                .map(Value::get)
                .collect::<TallyResult<Vec<f64>>>()?;
            Ok(ordered_sum(terms))
        })
    }
}

fn ordered_sum(mut terms: Vec<f64>) -> f64 {
    terms.sort_by(f64::total_cmp);
    terms.into_iter().sum()
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::ready(value)
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::ready(0.0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "<deferred>"),
        }
    }
}
