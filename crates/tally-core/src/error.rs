//! Error types for the Tally library.
//!
//! Every failure inside the series algebra is local and synchronous: a query
//! either returns a value or one of the errors below. Nothing is retried and no
//! partial result is returned.

use thiserror::Error;

/// A specialized Result type for Tally operations.
pub type TallyResult<T> = Result<T, TallyError>;

/// The main error type for Tally operations.
///
/// Errors are `Clone` so that a failure memoized inside an evaluation scope can
/// be handed to every later reader of the same element.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TallyError {
    /// Error in date calculations or invalid date.
    #[error("Invalid date: {message}")]
    InvalidDate {
        /// Description of the date error.
        message: String,
    },

    /// A period whose end precedes its start.
    #[error("Invalid period: {start} is after {end}")]
    InvalidPeriod {
        /// Requested start date.
        start: String,
        /// Requested end date.
        end: String,
    },

    /// A window or point query fell outside the domain of a series or value.
    #[error("Range error: {reason}")]
    Range {
        /// Description of the out-of-range request.
        reason: String,
    },

    /// An operation was requested on a series kind that does not support it.
    #[error("Undefined operation: `{operation}` is not supported by {kind} series")]
    UndefinedOperation {
        /// The operation name (`at`, `accrue`, `over`, ...).
        operation: String,
        /// The series kind the operation was issued against.
        kind: String,
    },

    /// A value or element depends on itself before it has been produced.
    #[error("Unbounded recursion while evaluating {subject}")]
    UnboundedRecursion {
        /// What was being evaluated when the cycle was detected.
        subject: String,
    },

    /// Two values could not be combined because their periods, dates or
    /// conventions do not line up.
    #[error("Alignment error: {reason}")]
    Alignment {
        /// Description of the mismatch.
        reason: String,
    },

    /// A line item failed while building its series.
    #[error("Definition of {node} failed: {reason}")]
    Definition {
        /// Path of the failing node.
        node: String,
        /// Description of the failure.
        reason: String,
    },

    /// A series view outlived the evaluation scope that backed it.
    #[error("Evaluation scope is closed")]
    ScopeClosed,
}

impl TallyError {
    /// Creates an invalid date error.
    #[must_use]
    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::InvalidDate {
            message: message.into(),
        }
    }

    /// Creates a range error.
    #[must_use]
    pub fn range(reason: impl Into<String>) -> Self {
        Self::Range {
            reason: reason.into(),
        }
    }

    /// Creates an undefined operation error.
    #[must_use]
    pub fn undefined_operation(operation: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UndefinedOperation {
            operation: operation.into(),
            kind: kind.into(),
        }
    }

    /// Creates an unbounded recursion error.
    #[must_use]
    pub fn unbounded_recursion(subject: impl Into<String>) -> Self {
        Self::UnboundedRecursion {
            subject: subject.into(),
        }
    }

    /// Creates an alignment error.
    #[must_use]
    pub fn alignment(reason: impl Into<String>) -> Self {
        Self::Alignment {
            reason: reason.into(),
        }
    }

    /// Creates a definition error for the node at `node`.
    #[must_use]
    pub fn definition(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Definition {
            node: node.into(),
            reason: reason.into(),
        }
    }
}
