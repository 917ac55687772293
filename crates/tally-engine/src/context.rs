//! The evaluation context handed to line items.

use std::sync::Weak;

use tally_core::prelude::*;

use crate::model::{AccrualRef, BalanceRef, Model, NodeId, PaymentRef};
use crate::scope::{any_view, view, ScopeInner};

/// What a line item sees while its series is being built.
///
/// Reads go through the scope's memo, so every item reading the same node
/// shares one computation. Reads of nodes the item did not declare as
/// dependencies still work but are logged, since the model could not check
/// them for cycles.
pub struct EvalContext {
    scope: Weak<ScopeInner>,
    model: Model,
    node: NodeId,
}

impl EvalContext {
    pub(crate) fn new(scope: Weak<ScopeInner>, model: Model, node: NodeId) -> Self {
        Self { scope, model, node }
    }

    /// The node being defined.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Dotted path of the node being defined.
    #[must_use]
    pub fn path(&self) -> &str {
        self.model.path(self.node)
    }

    /// The model being evaluated.
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The structural parent of the node being defined.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.model.parent(self.node)
    }

    fn check_declared(&self, target: NodeId) {
        if target == self.node {
            return;
        }
        let declared = self
            .model
            .dependencies(self.node)
            .iter()
            .any(|dependency| dependency.node() == target);
        if !declared {
            tracing::warn!(
                reader = %self.path(),
                target = %self.model.path(target),
                "read of undeclared dependency"
            );
        }
    }

    /// Memoized accruals of `node`.
    #[must_use]
    pub fn accruals(&self, node: AccrualRef) -> AccrualSeries {
        self.check_declared(node.node());
        view(self.scope.clone(), node.node())
    }

    /// Memoized payments of `node`.
    #[must_use]
    pub fn payments(&self, node: PaymentRef) -> PaymentSeries {
        self.check_declared(node.node());
        view(self.scope.clone(), node.node())
    }

    /// Memoized balances of `node`.
    #[must_use]
    pub fn balances(&self, node: BalanceRef) -> BalanceSeries {
        self.check_declared(node.node());
        view(self.scope.clone(), node.node())
    }

    /// Resolves a sibling of the node being defined by name.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Definition` if there is no such sibling.
    pub fn sibling(&self, name: &str) -> TallyResult<NodeId> {
        self.parent()
            .and_then(|parent| self.model.child(parent, name))
            .ok_or_else(|| self.missing(name))
    }

    /// Resolves a dotted path from the model root.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Definition` if the path names no node.
    pub fn find(&self, path: &str) -> TallyResult<NodeId> {
        self.model.find(path).map_err(|_| self.missing(path))
    }

    /// Memoized series of the node at `path`, of whatever kind it is.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Definition` if the path names no node,
    /// `TallyError::UndefinedOperation` if it names a group, or
    /// `TallyError::ScopeClosed` if the scope is gone.
    pub fn series(&self, path: &str) -> TallyResult<AnySeries> {
        let target = self.find(path)?;
        self.check_declared(target);
        let scope = self.scope.upgrade().ok_or(TallyError::ScopeClosed)?;
        any_view(&scope, target, "series")
    }

    fn missing(&self, what: &str) -> TallyError {
        TallyError::Definition {
            node: self.path().to_string(),
            reason: format!("no node named '{what}'"),
        }
    }
}

impl std::fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("node", &self.path())
            .finish_non_exhaustive()
    }
}
