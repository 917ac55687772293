//! Model trees: nodes, typed references and the builder.
//!
//! A model is an arena of nodes. Every node except the root has exactly one
//! parent, and children are owned by their parent. Series nodes carry a line
//! item; group nodes only organize children.
//!
//! Nodes are declared first and defined later, so a line item can be handed a
//! reference to a node whose own definition reads it back.
//!
//! ```rust
//! use tally_core::prelude::*;
//! use tally_engine::prelude::*;
//!
//! struct Flat(f64);
//!
//! impl AccrualItem for Flat {
//!     fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
//!         let value = self.0;
//!         let start = Date::from_ymd(2024, 1, 1)?;
//!         Ok(AccrualSeries::generate(move || {
//!             Period::series(start, Frequency::Quarterly, DateRoll::SameDay)
//!                 .map(move |p| Accrual::cmonthly(p, value))
//!         }))
//!     }
//! }
//!
//! let mut builder = ModelBuilder::new("model");
//! let revenue = builder.accrual(builder.root(), "revenue").unwrap();
//! builder.define_accrual(revenue, Flat(100.0)).unwrap();
//! let model = builder.build().unwrap();
//!
//! assert_eq!(model.find("revenue").unwrap(), revenue.node());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use tally_core::SeriesKind;

use crate::config::{ScopeOptions, Validate};
use crate::error::{EngineError, EngineResult};
use crate::graph::DependencyGraph;
use crate::item::{AccrualItem, BalanceItem, Definition, Dependency, PaymentItem};
use crate::scope::Scope;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a node within one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates an id from an arena index.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// The arena index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

macro_rules! typed_ref {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub struct $name(NodeId);

        impl $name {
            /// The underlying node.
            #[must_use]
            pub fn node(&self) -> NodeId {
                self.0
            }
        }

        impl From<$name> for NodeId {
            fn from(r: $name) -> NodeId {
                r.0
            }
        }
    };
}

typed_ref!(
    /// A read handle on an accrual node.
    AccrualRef
);
typed_ref!(
    /// A read handle on a payment node.
    PaymentRef
);
typed_ref!(
    /// A read handle on a balance node.
    BalanceRef
);

/// What a node holds.
///
/// Serializes as its display name: `group`, `accrual`, `payment` or `balance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Organizes children; produces no series.
    Group,
    /// Produces a series of the given kind.
    Series(SeriesKind),
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Group => f.write_str("group"),
            NodeKind::Series(kind) => write!(f, "{kind}"),
        }
    }
}

impl Serialize for NodeKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// BUILDER
// =============================================================================

struct NodeSlot {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    definition: Option<Definition>,
}

/// Assembles a [`Model`].
pub struct ModelBuilder {
    slots: Vec<NodeSlot>,
}

impl ModelBuilder {
    /// Starts a model whose root is a group named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            slots: vec![NodeSlot {
                name: name.into(),
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Group,
                definition: None,
            }],
        }
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn slot(&self, node: NodeId) -> EngineResult<&NodeSlot> {
        self.slots
            .get(node.index())
            .ok_or_else(|| EngineError::NodeNotFound(node.to_string()))
    }

    fn path(&self, node: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            match self.slots.get(id.index()) {
                Some(slot) => {
                    names.push(slot.name.as_str());
                    current = slot.parent;
                }
                None => break,
            }
        }
        names.reverse();
        names.join(".")
    }

    fn declare(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> EngineResult<NodeId> {
        let parent_slot = self.slot(parent)?;
        if parent_slot.kind != NodeKind::Group {
            return Err(EngineError::kind_mismatch(
                self.path(parent),
                NodeKind::Group,
                parent_slot.kind,
            ));
        }
        if parent_slot
            .children
            .iter()
            .any(|child| self.slots[child.index()].name == name)
        {
            return Err(EngineError::DuplicateChild {
                parent: self.path(parent),
                name: name.to_string(),
            });
        }

        let id = NodeId::from_index(self.slots.len());
        self.slots.push(NodeSlot {
            name: name.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            kind,
            definition: None,
        });
        self.slots[parent.index()].children.push(id);
        Ok(id)
    }

    /// Declares a group node under `parent`.
    pub fn group(&mut self, parent: NodeId, name: &str) -> EngineResult<NodeId> {
        self.declare(parent, name, NodeKind::Group)
    }

    /// Declares an accrual node under `parent`, to be defined later.
    pub fn accrual(&mut self, parent: NodeId, name: &str) -> EngineResult<AccrualRef> {
        self.declare(parent, name, NodeKind::Series(SeriesKind::Accrual))
            .map(AccrualRef)
    }

    /// Declares a payment node under `parent`, to be defined later.
    pub fn payment(&mut self, parent: NodeId, name: &str) -> EngineResult<PaymentRef> {
        self.declare(parent, name, NodeKind::Series(SeriesKind::Payment))
            .map(PaymentRef)
    }

    /// Declares a balance node under `parent`, to be defined later.
    pub fn balance(&mut self, parent: NodeId, name: &str) -> EngineResult<BalanceRef> {
        self.declare(parent, name, NodeKind::Series(SeriesKind::Balance))
            .map(BalanceRef)
    }

    fn define(&mut self, node: NodeId, definition: Definition) -> EngineResult<()> {
        let path = self.path(node);
        let slot = self
            .slots
            .get_mut(node.index())
            .ok_or_else(|| EngineError::NodeNotFound(node.to_string()))?;
        if slot.definition.is_some() {
            return Err(EngineError::AlreadyDefined(path));
        }
        slot.definition = Some(definition);
        Ok(())
    }

    /// Attaches the line item behind an accrual node.
    pub fn define_accrual(
        &mut self,
        node: AccrualRef,
        item: impl AccrualItem,
    ) -> EngineResult<()> {
        self.define(node.0, Definition::Accrual(Arc::new(item)))
    }

    /// Attaches the line item behind a payment node.
    pub fn define_payment(
        &mut self,
        node: PaymentRef,
        item: impl PaymentItem,
    ) -> EngineResult<()> {
        self.define(node.0, Definition::Payment(Arc::new(item)))
    }

    /// Attaches the line item behind a balance node.
    pub fn define_balance(
        &mut self,
        node: BalanceRef,
        item: impl BalanceItem,
    ) -> EngineResult<()> {
        self.define(node.0, Definition::Balance(Arc::new(item)))
    }

    /// Declares and defines an accrual node in one step.
    pub fn add_accrual(
        &mut self,
        parent: NodeId,
        name: &str,
        item: impl AccrualItem,
    ) -> EngineResult<AccrualRef> {
        let node = self.accrual(parent, name)?;
        self.define_accrual(node, item)?;
        Ok(node)
    }

    /// Declares and defines a payment node in one step.
    pub fn add_payment(
        &mut self,
        parent: NodeId,
        name: &str,
        item: impl PaymentItem,
    ) -> EngineResult<PaymentRef> {
        let node = self.payment(parent, name)?;
        self.define_payment(node, item)?;
        Ok(node)
    }

    /// Declares and defines a balance node in one step.
    pub fn add_balance(
        &mut self,
        parent: NodeId,
        name: &str,
        item: impl BalanceItem,
    ) -> EngineResult<BalanceRef> {
        let node = self.balance(parent, name)?;
        self.define_balance(node, item)?;
        Ok(node)
    }

    /// Validates the tree and freezes it into a [`Model`].
    ///
    /// # Errors
    ///
    /// - `UndefinedNode` if a series node was never defined
    /// - `NodeNotFound` or `KindMismatch` if a declared dependency does not
    ///   name a series node
    /// - `CircularDependency` if same-date dependencies form a cycle
    pub fn build(self) -> EngineResult<Model> {
        let mut graph = DependencyGraph::new();
        let mut nodes = Vec::with_capacity(self.slots.len());

        for (index, slot) in self.slots.iter().enumerate() {
            let id = NodeId::from_index(index);
            let dependencies = match (&slot.kind, &slot.definition) {
                (NodeKind::Group, _) => Vec::new(),
                (NodeKind::Series(_), None) => {
                    return Err(EngineError::UndefinedNode(self.path(id)));
                }
                (NodeKind::Series(kind), Some(definition)) => {
                    if definition.kind() != *kind {
                        return Err(EngineError::kind_mismatch(
                            self.path(id),
                            kind,
                            definition.kind(),
                        ));
                    }
                    definition.dependencies()
                }
            };

            for dependency in &dependencies {
                let target = self.slot(dependency.node())?;
                if target.kind == NodeKind::Group {
                    return Err(EngineError::kind_mismatch(
                        self.path(dependency.node()),
                        "series",
                        NodeKind::Group,
                    ));
                }
            }

            if slot.kind != NodeKind::Group {
                graph.add(id, &dependencies);
            }
            nodes.push(NodeData {
                name: slot.name.clone(),
                path: self.path(id),
                parent: slot.parent,
                children: slot.children.clone(),
                kind: slot.kind,
                definition: slot.definition.clone(),
                dependencies,
            });
        }

        if let Some(cycle) = graph.find_cycle() {
            return Err(EngineError::CircularDependency {
                cycle: cycle.iter().map(|id| self.path(*id)).collect(),
            });
        }

        tracing::debug!(
            model = %self.slots[0].name,
            nodes = nodes.len(),
            "model built"
        );

        Ok(Model {
            inner: Arc::new(ModelInner { nodes, graph }),
        })
    }
}

// =============================================================================
// MODEL
// =============================================================================

pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) path: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) definition: Option<Definition>,
    pub(crate) dependencies: Vec<Dependency>,
}

struct ModelInner {
    nodes: Vec<NodeData>,
    graph: DependencyGraph,
}

/// A validated, immutable model tree.
///
/// Cloning is cheap and clones share the same tree.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name(self.root()))
            .field("nodes", &self.len())
            .finish()
    }
}

impl Model {
    pub(crate) fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.inner.nodes.get(node.index())
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, groups included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    /// Always false: a model has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    /// All node ids in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.inner.nodes.len()).map(NodeId::from_index)
    }

    /// The node's own name.
    #[must_use]
    pub fn name(&self, node: NodeId) -> &str {
        self.data(node).map_or("", |d| d.name.as_str())
    }

    /// Dotted path from the root, e.g. `model.income_statement.revenue`.
    #[must_use]
    pub fn path(&self, node: NodeId) -> &str {
        self.data(node).map_or("", |d| d.path.as_str())
    }

    /// The node's kind.
    #[must_use]
    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.data(node).map(|d| d.kind)
    }

    /// The structural parent, `None` at the root.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).and_then(|d| d.parent)
    }

    /// Children in declaration order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.data(node).map_or(&[], |d| d.children.as_slice())
    }

    /// The child of `node` called `name`.
    #[must_use]
    pub fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|child| self.name(*child) == name)
    }

    /// Every ancestor of `node`, nearest first.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |id| self.parent(*id))
    }

    /// Resolves a dotted path of child names below the root.
    ///
    /// A leading segment equal to the root's own name is optional, and an
    /// empty path is the root.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if any segment does not name a child.
    pub fn find(&self, path: &str) -> EngineResult<NodeId> {
        let root = self.root();
        let mut segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.first() == Some(&self.name(root)) && self.child(root, segments[0]).is_none()
        {
            segments.remove(0);
        }
        self.find_from(root, &segments)
            .ok_or_else(|| EngineError::NodeNotFound(path.to_string()))
    }

    /// Resolves child names starting at `node`.
    #[must_use]
    pub fn find_from(&self, node: NodeId, segments: &[&str]) -> Option<NodeId> {
        segments
            .iter()
            .try_fold(node, |current, name| self.child(current, name))
    }

    fn series_node(&self, path: &str, expected: SeriesKind) -> EngineResult<NodeId> {
        let node = self.find(path)?;
        match self.kind(node) {
            Some(NodeKind::Series(kind)) if kind == expected => Ok(node),
            Some(actual) => Err(EngineError::kind_mismatch(self.path(node), expected, actual)),
            None => Err(EngineError::NodeNotFound(path.to_string())),
        }
    }

    /// Looks up an accrual node by path.
    pub fn accrual_ref(&self, path: &str) -> EngineResult<AccrualRef> {
        self.series_node(path, SeriesKind::Accrual).map(AccrualRef)
    }

    /// Looks up a payment node by path.
    pub fn payment_ref(&self, path: &str) -> EngineResult<PaymentRef> {
        self.series_node(path, SeriesKind::Payment).map(PaymentRef)
    }

    /// Looks up a balance node by path.
    pub fn balance_ref(&self, path: &str) -> EngineResult<BalanceRef> {
        self.series_node(path, SeriesKind::Balance).map(BalanceRef)
    }

    /// Declared reads of a series node.
    #[must_use]
    pub fn dependencies(&self, node: NodeId) -> &[Dependency] {
        self.data(node).map_or(&[], |d| d.dependencies.as_slice())
    }

    /// Nodes that declare a read of `node`.
    #[must_use]
    pub fn dependents(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.graph.dependents_of(node)
    }

    /// Nodes that `node` declares a read of, without timing.
    #[must_use]
    pub fn upstream(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.graph.dependencies_of(node)
    }

    /// Series nodes ordered so that same-date dependencies come first.
    #[must_use]
    pub fn evaluation_order(&self) -> Vec<NodeId> {
        self.inner.graph.evaluation_order().unwrap_or_default()
    }

    /// Opens an evaluation scope with default options.
    #[must_use]
    pub fn enter_scope(&self) -> Scope {
        Scope::new(self.clone(), ScopeOptions::default())
    }

    /// Opens an evaluation scope with the given options.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the options fail validation.
    pub fn enter_scope_with(&self, options: ScopeOptions) -> EngineResult<Scope> {
        options.validate_or_error()?;
        Ok(Scope::new(self.clone(), options))
    }

    /// Runs `f` inside a fresh scope that is closed when `f` returns.
    pub fn with_scope<R>(&self, f: impl FnOnce(&Scope) -> R) -> R {
        let scope = self.enter_scope();
        f(&scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvalContext;
    use tally_core::{AccrualSeries, BalanceSeries, TallyResult};

    struct Empty(Vec<Dependency>);

    impl AccrualItem for Empty {
        fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
            Ok(AccrualSeries::empty())
        }

        fn dependencies(&self) -> Vec<Dependency> {
            self.0.clone()
        }
    }

    impl BalanceItem for Empty {
        fn balances(&self, _ctx: &EvalContext) -> TallyResult<BalanceSeries> {
            Ok(BalanceSeries::empty())
        }

        fn dependencies(&self) -> Vec<Dependency> {
            self.0.clone()
        }
    }

    fn sample() -> (Model, AccrualRef, BalanceRef) {
        let mut builder = ModelBuilder::new("model");
        let is = builder.group(builder.root(), "income_statement").unwrap();
        let bs = builder.group(builder.root(), "balance_sheet").unwrap();
        let revenue = builder.add_accrual(is, "revenue", Empty(vec![])).unwrap();
        let cash = builder
            .add_balance(bs, "cash", Empty(vec![Dependency::current(revenue)]))
            .unwrap();
        (builder.build().unwrap(), revenue, cash)
    }

    #[test]
    fn test_navigation() {
        let (model, revenue, cash) = sample();
        assert_eq!(model.path(cash.node()), "model.balance_sheet.cash");
        assert_eq!(model.find("balance_sheet.cash").unwrap(), cash.node());
        assert_eq!(model.find("model.income_statement.revenue").unwrap(), revenue.node());
        assert_eq!(model.find("").unwrap(), model.root());

        let is = model.parent(revenue.node()).unwrap();
        assert_eq!(model.name(is), "income_statement");
        assert_eq!(model.ancestors(revenue.node()).collect::<Vec<_>>(), vec![is, model.root()]);
        assert_eq!(model.kind(is), Some(NodeKind::Group));
        assert!(model.find("income_statement.cash").is_err());
    }

    #[test]
    fn test_typed_lookup() {
        let (model, revenue, _) = sample();
        assert_eq!(model.accrual_ref("income_statement.revenue").unwrap(), revenue);
        assert!(matches!(
            model.balance_ref("income_statement.revenue"),
            Err(EngineError::KindMismatch { .. })
        ));
        assert_eq!(model.dependents(revenue.node()).len(), 1);
    }

    #[test]
    fn test_duplicate_child_rejected() {
        let mut builder = ModelBuilder::new("model");
        builder.group(builder.root(), "assets").unwrap();
        assert!(matches!(
            builder.group(builder.root(), "assets"),
            Err(EngineError::DuplicateChild { .. })
        ));
    }

    #[test]
    fn test_children_only_under_groups() {
        let mut builder = ModelBuilder::new("model");
        let revenue = builder.accrual(builder.root(), "revenue").unwrap();
        assert!(matches!(
            builder.group(revenue.node(), "nested"),
            Err(EngineError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_undefined_node_rejected() {
        let mut builder = ModelBuilder::new("model");
        builder.accrual(builder.root(), "revenue").unwrap();
        assert!(matches!(builder.build(), Err(EngineError::UndefinedNode(path)) if path == "model.revenue"));
    }

    #[test]
    fn test_double_definition_rejected() {
        let mut builder = ModelBuilder::new("model");
        let revenue = builder.add_accrual(builder.root(), "revenue", Empty(vec![])).unwrap();
        assert!(matches!(
            builder.define_accrual(revenue, Empty(vec![])),
            Err(EngineError::AlreadyDefined(_))
        ));
    }

    #[test]
    fn test_cycle_rejected_at_build() {
        let mut builder = ModelBuilder::new("model");
        let a = builder.accrual(builder.root(), "a").unwrap();
        let b = builder.accrual(builder.root(), "b").unwrap();
        builder.define_accrual(a, Empty(vec![Dependency::current(b)])).unwrap();
        builder.define_accrual(b, Empty(vec![Dependency::current(a)])).unwrap();
        match builder.build() {
            Err(EngineError::CircularDependency { cycle }) => {
                assert_eq!(cycle, vec!["model.a", "model.b", "model.a"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_lagged_read_does_not_hide_current_cycle() {
        let mut builder = ModelBuilder::new("model");
        let cash = builder.balance(builder.root(), "cash").unwrap();
        let draws = builder.accrual(builder.root(), "draws").unwrap();
        builder.define_balance(cash, Empty(vec![Dependency::current(draws)])).unwrap();
        builder
            .define_accrual(
                draws,
                Empty(vec![Dependency::current(cash), Dependency::lagged(cash)]),
            )
            .unwrap();
        match builder.build() {
            Err(EngineError::CircularDependency { cycle }) => {
                assert_eq!(cycle, vec!["model.cash", "model.draws", "model.cash"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_lagged_loop_accepted() {
        let mut builder = ModelBuilder::new("model");
        let a = builder.balance(builder.root(), "cash").unwrap();
        let b = builder.accrual(builder.root(), "draws").unwrap();
        builder.define_balance(a, Empty(vec![Dependency::current(b)])).unwrap();
        builder.define_accrual(b, Empty(vec![Dependency::lagged(a)])).unwrap();
        let model = builder.build().unwrap();
        assert_eq!(model.evaluation_order(), vec![b.node(), a.node()]);
    }

    #[test]
    fn test_dependency_on_group_rejected() {
        let mut builder = ModelBuilder::new("model");
        let group = builder.group(builder.root(), "assets").unwrap();
        builder
            .add_accrual(builder.root(), "a", Empty(vec![Dependency::current(group)]))
            .unwrap();
        assert!(matches!(builder.build(), Err(EngineError::KindMismatch { .. })));
    }
}
