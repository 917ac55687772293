//! # Tally Engine
//!
//! Model trees and evaluation scopes for Tally projections.
//!
//! This crate provides:
//! - [`ModelBuilder`] / [`Model`]: an owned tree of line items with typed read
//!   handles and a validated dependency graph
//! - [`AccrualItem`], [`PaymentItem`], [`BalanceItem`]: the line-item traits
//! - [`Scope`]: memoized evaluation of a model for one batch of queries
//! - [`NodeDescriptor`]: a read-only outline of a model
//!
//! ## Architecture
//!
//! ```text
//! ModelBuilder ─> build() ─> Model ─> enter_scope() ─> Scope ─┬─> accrue / over / at / w_avg
//!      │             │                                         │
//!      │             └─> cycle check                           └─> memo per node ─> line items
//!      └─> declare / define
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod describe;
pub mod error;
pub mod item;
pub mod model;
pub mod scope;

mod graph;

// Re-exports
pub use config::{ConfigError, ScopeOptions, Validate};
pub use context::EvalContext;
pub use describe::NodeDescriptor;
pub use error::{EngineError, EngineResult};
pub use item::{AccrualItem, BalanceItem, Dependency, PaymentItem};
pub use model::{AccrualRef, BalanceRef, Model, ModelBuilder, NodeId, NodeKind, PaymentRef};
pub use scope::{Scope, ScopeStats};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::ScopeOptions;
    pub use crate::context::EvalContext;
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::item::{AccrualItem, BalanceItem, Dependency, PaymentItem};
    pub use crate::model::{
        AccrualRef, BalanceRef, Model, ModelBuilder, NodeId, NodeKind, PaymentRef,
    };
    pub use crate::scope::{Scope, ScopeStats};
}
