//! Line-item traits and dependency declarations.
//!
//! A line item turns an [`EvalContext`] into a series. It reads other nodes
//! through typed references it was given at construction, and declares those
//! reads through [`dependencies`](AccrualItem::dependencies) so that the model
//! can reject circular definitions before any query runs.

use serde::Serialize;
use std::sync::Arc;

use tally_core::{AccrualSeries, BalanceSeries, PaymentSeries, SeriesKind, TallyResult};

use crate::context::EvalContext;
use crate::model::NodeId;

/// A declared read of another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "timing", content = "node", rename_all = "snake_case")]
pub enum Dependency {
    /// Reads values on the same dates being produced.
    Current(NodeId),
    /// Reads only values dated strictly earlier than the ones being produced,
    /// such as a balance at `date - 1`. Lagged reads may close a loop.
    Lagged(NodeId),
}

impl Dependency {
    /// A same-date dependency.
    pub fn current(node: impl Into<NodeId>) -> Self {
        Self::Current(node.into())
    }

    /// A dependency on strictly earlier values.
    pub fn lagged(node: impl Into<NodeId>) -> Self {
        Self::Lagged(node.into())
    }

    /// The node being read.
    #[must_use]
    pub fn node(&self) -> NodeId {
        match self {
            Self::Current(node) | Self::Lagged(node) => *node,
        }
    }

    /// True for lagged dependencies.
    #[must_use]
    pub fn is_lagged(&self) -> bool {
        matches!(self, Self::Lagged(_))
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A line item producing accruals.
pub trait AccrualItem: Send + Sync + 'static {
    /// Builds the item's series. Called at most once per scope.
    fn accruals(&self, ctx: &EvalContext) -> TallyResult<AccrualSeries>;

    /// Nodes this item reads.
    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Name shown by model descriptors.
    fn label(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

/// A line item producing payments.
pub trait PaymentItem: Send + Sync + 'static {
    /// Builds the item's series. Called at most once per scope.
    fn payments(&self, ctx: &EvalContext) -> TallyResult<PaymentSeries>;

    /// Nodes this item reads.
    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Name shown by model descriptors.
    fn label(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

/// A line item producing balances.
pub trait BalanceItem: Send + Sync + 'static {
    /// Builds the item's series. Called at most once per scope.
    fn balances(&self, ctx: &EvalContext) -> TallyResult<BalanceSeries>;

    /// Nodes this item reads.
    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Name shown by model descriptors.
    fn label(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

/// The definition attached to a series node.
#[derive(Clone)]
pub(crate) enum Definition {
    Accrual(Arc<dyn AccrualItem>),
    Payment(Arc<dyn PaymentItem>),
    Balance(Arc<dyn BalanceItem>),
}

impl Definition {
    pub(crate) fn kind(&self) -> SeriesKind {
        match self {
            Definition::Accrual(_) => SeriesKind::Accrual,
            Definition::Payment(_) => SeriesKind::Payment,
            Definition::Balance(_) => SeriesKind::Balance,
        }
    }

    pub(crate) fn dependencies(&self) -> Vec<Dependency> {
        match self {
            Definition::Accrual(item) => item.dependencies(),
            Definition::Payment(item) => item.dependencies(),
            Definition::Balance(item) => item.dependencies(),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Definition::Accrual(item) => item.label(),
            Definition::Payment(item) => item.label(),
            Definition::Balance(item) => item.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat;

    impl AccrualItem for Flat {
        fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
            Ok(AccrualSeries::empty())
        }
    }

    #[test]
    fn test_default_label_is_type_name() {
        let definition = Definition::Accrual(Arc::new(Flat));
        assert_eq!(definition.label(), "Flat");
        assert_eq!(definition.kind(), SeriesKind::Accrual);
        assert!(definition.dependencies().is_empty());
    }

    #[test]
    fn test_dependency_accessors() {
        let lagged = Dependency::lagged(NodeId::from_index(3));
        assert!(lagged.is_lagged());
        assert_eq!(lagged.node(), NodeId::from_index(3));
        assert!(!Dependency::current(NodeId::from_index(1)).is_lagged());
    }
}
