//! Engine error types.

use thiserror::Error;

use tally_core::TallyError;

use crate::config::ConfigError;

/// Engine operation result type.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
///
/// These errors come from assembling and navigating a model. Failures while
/// evaluating series inside a scope are reported as [`TallyError`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// A cycle made only of same-date dependencies.
    #[error("circular dependency: {}", cycle.join(" -> "))]
    CircularDependency {
        /// Paths of the nodes on the cycle, first node repeated at the end.
        cycle: Vec<String>,
    },

    /// No node at the given path.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A series node was declared but never given a definition.
    #[error("node declared but never defined: {0}")]
    UndefinedNode(String),

    /// A series node was given a second definition.
    #[error("node already defined: {0}")]
    AlreadyDefined(String),

    /// Two children of one parent share a name.
    #[error("duplicate child '{name}' under {parent}")]
    DuplicateChild {
        /// Path of the parent node.
        parent: String,
        /// The repeated child name.
        name: String,
    },

    /// A node is of a different kind than the caller requires.
    #[error("{node} is a {actual} node, expected {expected}")]
    KindMismatch {
        /// Path of the node.
        node: String,
        /// The kind the caller asked for.
        expected: String,
        /// The node's actual kind.
        actual: String,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Evaluation failure.
    #[error(transparent)]
    Tally(#[from] TallyError),
}

impl EngineError {
    /// Creates a kind mismatch error.
    #[must_use]
    pub fn kind_mismatch(
        node: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::KindMismatch {
            node: node.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
