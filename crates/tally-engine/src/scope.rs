//! Evaluation scopes: per-batch memoization of series and queries.
//!
//! A [`Scope`] instantiates each line item at most once, memoizes every
//! element a node's series produces, and optionally memoizes whole query
//! results keyed by `(node, query, arguments)`. Series handed out by a scope
//! are views over that memo, so repeated traversals and sibling reads share
//! one computation.
//!
//! Dropping the scope discards everything. Views that outlive it fail with
//! `TallyError::ScopeClosed` instead of recomputing.

use parking_lot::ReentrantMutex;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tally_core::prelude::*;
use tally_core::series::Stream;

use crate::config::ScopeOptions;
use crate::context::EvalContext;
use crate::item::Definition;
use crate::model::{AccrualRef, BalanceRef, Model, NodeId, NodeKind, PaymentRef};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// STATISTICS
// =============================================================================

/// Counters describing the work a scope has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScopeStats {
    /// Elements pulled from line-item series and stored.
    pub elements_produced: u64,
    /// Element reads served from the memo.
    pub memo_hits: u64,
    /// Queries answered from the query cache.
    pub query_hits: u64,
    /// Queries computed and stored.
    pub query_misses: u64,
    /// Line items whose series were built.
    pub definitions_instantiated: u64,
}

impl ScopeStats {
    /// Fraction of queries served from the cache.
    #[must_use]
    pub fn query_hit_rate(&self) -> f64 {
        let total = self.query_hits + self.query_misses;
        if total == 0 {
            0.0
        } else {
            self.query_hits as f64 / total as f64
        }
    }
}

// =============================================================================
// MEMO
// =============================================================================

pub(crate) struct Memo<T> {
    items: Vec<T>,
    source: Option<Stream<T>>,
    instantiated: bool,
    exhausted: bool,
    extending: bool,
    error: Option<TallyError>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            source: None,
            instantiated: false,
            exhausted: false,
            extending: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Query {
    Accrue(Date, Date),
    Over(Date, Date),
    At(Date),
    WAvg(Date, Date),
}

#[derive(Default)]
pub(crate) struct ScopeState {
    accruals: HashMap<NodeId, Memo<Accrual>>,
    payments: HashMap<NodeId, Memo<Payment>>,
    balances: HashMap<NodeId, Memo<Balance>>,
    queries: HashMap<(NodeId, Query), TallyResult<f64>>,
    stats: ScopeStats,
    depth: usize,
}

/// Elements a scope knows how to memoize.
pub(crate) trait Memoized: Element {
    fn memos(state: &mut ScopeState) -> &mut HashMap<NodeId, Memo<Self>>;

    fn instantiate(definition: &Definition, ctx: &EvalContext) -> TallyResult<Series<Self>>;
}

fn wrong_definition(definition: &Definition, expected: SeriesKind) -> TallyError {
    TallyError::undefined_operation(
        format!("read as {expected}"),
        definition.kind().name(),
    )
}

impl Memoized for Accrual {
    fn memos(state: &mut ScopeState) -> &mut HashMap<NodeId, Memo<Self>> {
        &mut state.accruals
    }

    fn instantiate(definition: &Definition, ctx: &EvalContext) -> TallyResult<AccrualSeries> {
        match definition {
            Definition::Accrual(item) => item.accruals(ctx),
            other => Err(wrong_definition(other, SeriesKind::Accrual)),
        }
    }
}

impl Memoized for Payment {
    fn memos(state: &mut ScopeState) -> &mut HashMap<NodeId, Memo<Self>> {
        &mut state.payments
    }

    fn instantiate(definition: &Definition, ctx: &EvalContext) -> TallyResult<PaymentSeries> {
        match definition {
            Definition::Payment(item) => item.payments(ctx),
            other => Err(wrong_definition(other, SeriesKind::Payment)),
        }
    }
}

impl Memoized for Balance {
    fn memos(state: &mut ScopeState) -> &mut HashMap<NodeId, Memo<Self>> {
        &mut state.balances
    }

    fn instantiate(definition: &Definition, ctx: &EvalContext) -> TallyResult<BalanceSeries> {
        match definition {
            Definition::Balance(item) => item.balances(ctx),
            other => Err(wrong_definition(other, SeriesKind::Balance)),
        }
    }
}

// =============================================================================
// SCOPE INTERNALS
// =============================================================================

pub(crate) struct ScopeInner {
    id: u64,
    model: Model,
    options: ScopeOptions,
    state: ReentrantMutex<RefCell<ScopeState>>,
}

enum Step<T> {
    Instantiate,
    Pull(Option<Stream<T>>),
}

impl ScopeInner {
    /// Returns element `index` of `node`'s series, producing it if needed.
    ///
    /// The scope lock is held throughout, but the state borrow is released
    /// while the line item's stream runs so that it can read other nodes.
    fn element<T: Memoized>(self: &Arc<Self>, node: NodeId, index: usize) -> TallyResult<Option<T>> {
        let guard = self.state.lock();
        loop {
            let step = {
                let mut state = guard.borrow_mut();
                let depth = state.depth;
                let memo = T::memos(&mut state).entry(node).or_default();
                if let Some(item) = memo.items.get(index) {
                    let item = item.clone();
                    state.stats.memo_hits += 1;
                    return Ok(Some(item));
                }
                if let Some(err) = &memo.error {
                    return Err(err.clone());
                }
                if memo.exhausted {
                    return Ok(None);
                }
                if memo.extending {
                    return Err(TallyError::unbounded_recursion(format!(
                        "element {index} of {}",
                        self.model.path(node)
                    )));
                }
                if depth >= self.options.max_depth {
                    return Err(TallyError::unbounded_recursion(format!(
                        "{} (nesting deeper than {})",
                        self.model.path(node),
                        self.options.max_depth
                    )));
                }
                memo.extending = true;
                let step = if std::mem::replace(&mut memo.instantiated, true) {
                    Step::Pull(memo.source.take())
                } else {
                    Step::Instantiate
                };
                state.depth += 1;
                step
            };

            let source = match step {
                Step::Pull(source) => source,
                Step::Instantiate => match self.instantiate::<T>(node) {
                    Ok(series) => Some(series.iterate()),
                    Err(err) => {
                        self.finish::<T>(node, None, Some(Err(err.clone())));
                        return Err(err);
                    }
                },
            };

            let Some(mut source) = source else {
                self.finish::<T>(node, None, None);
                return Ok(None);
            };
            let next = source.next();
            let failure = match &next {
                Some(Err(err)) => Some(err.clone()),
                _ => None,
            };
            self.finish(node, Some(source), next);
            if let Some(err) = failure {
                return Err(err);
            }
        }
    }

    /// Records the outcome of one production step.
    fn finish<T: Memoized>(
        &self,
        node: NodeId,
        source: Option<Stream<T>>,
        next: Option<TallyResult<T>>,
    ) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.depth = state.depth.saturating_sub(1);
        let memo = T::memos(&mut state).entry(node).or_default();
        memo.extending = false;
        let produced = match next {
            Some(Ok(item)) => {
                let ordered = match memo.items.last() {
                    Some(previous) => T::check_order(previous, &item),
                    None => Ok(()),
                };
                match ordered {
                    Ok(()) => {
                        memo.items.push(item);
                        memo.source = source;
                        true
                    }
                    Err(err) => {
                        memo.error = Some(err);
                        false
                    }
                }
            }
            Some(Err(err)) => {
                memo.error = Some(err);
                false
            }
            None => {
                memo.exhausted = true;
                false
            }
        };
        let count = memo.items.len();
        if produced {
            state.stats.elements_produced += 1;
            tracing::trace!(
                scope = self.id,
                node = %self.model.path(node),
                index = count - 1,
                "element produced"
            );
        }
    }

    fn instantiate<T: Memoized>(self: &Arc<Self>, node: NodeId) -> TallyResult<Series<T>> {
        let Some(definition) = self.model.data(node).and_then(|d| d.definition.clone()) else {
            return Err(TallyError::Definition {
                node: self.model.path(node).to_string(),
                reason: "node has no definition".to_string(),
            });
        };
        let ctx = EvalContext::new(Arc::downgrade(self), self.model.clone(), node);
        let series = T::instantiate(&definition, &ctx)?;
        {
            let guard = self.state.lock();
            guard.borrow_mut().stats.definitions_instantiated += 1;
        }
        tracing::trace!(
            scope = self.id,
            node = %self.model.path(node),
            item = definition.label(),
            "definition instantiated"
        );
        Ok(series)
    }
}

/// Iterator over a node's memoized elements.
struct MemoStream<T> {
    scope: Weak<ScopeInner>,
    node: NodeId,
    index: usize,
    done: bool,
    _kind: std::marker::PhantomData<fn() -> T>,
}

impl<T: Memoized> Iterator for MemoStream<T> {
    type Item = TallyResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(scope) = self.scope.upgrade() else {
            self.done = true;
            return Some(Err(TallyError::ScopeClosed));
        };
        match scope.element::<T>(self.node, self.index) {
            Ok(Some(item)) => {
                self.index += 1;
                Some(Ok(item))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// A series backed by `node`'s memo in the scope behind `scope`.
pub(crate) fn view<T: Memoized>(scope: Weak<ScopeInner>, node: NodeId) -> Series<T> {
    Series::from_fn(move || MemoStream::<T> {
        scope: scope.clone(),
        node,
        index: 0,
        done: false,
        _kind: std::marker::PhantomData,
    })
}

// =============================================================================
// SCOPE
// =============================================================================

/// A bounded activation of the memo over one model.
///
/// # Example
///
/// ```rust
/// use tally_core::prelude::*;
/// use tally_engine::prelude::*;
///
/// struct History;
///
/// impl BalanceItem for History {
///     fn balances(&self, _ctx: &EvalContext) -> TallyResult<BalanceSeries> {
///         BalanceSeries::literal(vec![Balance::new(Date::from_ymd(2024, 1, 1)?, 10.0)])
///     }
/// }
///
/// let mut builder = ModelBuilder::new("model");
/// let cash = builder.add_balance(builder.root(), "cash", History).unwrap();
/// let model = builder.build().unwrap();
///
/// let scope = model.enter_scope();
/// let date = Date::from_ymd(2024, 6, 30).unwrap();
/// assert_eq!(scope.at(cash.node(), date).unwrap(), 10.0);
/// assert_eq!(scope.at(cash.node(), date).unwrap(), 10.0);
/// assert_eq!(scope.stats().query_hits, 1);
/// ```
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    /// Opens a scope over `model` with already validated options.
    #[must_use]
    pub(crate) fn new(model: Model, options: ScopeOptions) -> Self {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            scope = id,
            model = %model.name(model.root()),
            max_depth = options.max_depth,
            cache_queries = options.cache_queries,
            "scope opened"
        );
        Self {
            inner: Arc::new(ScopeInner {
                id,
                model,
                options,
                state: ReentrantMutex::new(RefCell::new(ScopeState::default())),
            }),
        }
    }

    /// Process-unique scope id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The model this scope evaluates.
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.inner.model
    }

    /// The options the scope was opened with.
    #[must_use]
    pub fn options(&self) -> &ScopeOptions {
        &self.inner.options
    }

    /// Snapshot of the work done so far.
    #[must_use]
    pub fn stats(&self) -> ScopeStats {
        self.inner.state.lock().borrow().stats
    }

    /// Closes the scope and returns its final statistics.
    pub fn close(self) -> ScopeStats {
        self.stats()
    }

    /// Memoized accruals of `node`.
    #[must_use]
    pub fn accruals(&self, node: AccrualRef) -> AccrualSeries {
        view(Arc::downgrade(&self.inner), node.node())
    }

    /// Memoized payments of `node`.
    #[must_use]
    pub fn payments(&self, node: PaymentRef) -> PaymentSeries {
        view(Arc::downgrade(&self.inner), node.node())
    }

    /// Memoized balances of `node`.
    #[must_use]
    pub fn balances(&self, node: BalanceRef) -> BalanceSeries {
        view(Arc::downgrade(&self.inner), node.node())
    }

    /// Memoized series of any series node.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::UndefinedOperation` for group nodes.
    pub fn series(&self, node: NodeId) -> TallyResult<AnySeries> {
        any_view(&self.inner, node, "series")
    }

    fn query(
        &self,
        node: NodeId,
        query: Query,
        name: &str,
        run: impl FnOnce(&AnySeries) -> TallyResult<f64>,
    ) -> TallyResult<f64> {
        let guard = self.inner.state.lock();
        let key = (node, query);
        if self.inner.options.cache_queries {
            let mut state = guard.borrow_mut();
            if let Some(result) = state.queries.get(&key).cloned() {
                state.stats.query_hits += 1;
                tracing::trace!(scope = self.inner.id, node = %node, ?query, "query cache hit");
                return result;
            }
        }

        let result = any_view(&self.inner, node, name).and_then(|series| run(&series));

        if self.inner.options.cache_queries {
            let mut state = guard.borrow_mut();
            state.stats.query_misses += 1;
            state.queries.insert(key, result.clone());
            tracing::trace!(scope = self.inner.id, node = %node, ?query, "query cache miss");
        }
        result
    }

    /// Total accrued by an accrual node over `[start, end)`.
    pub fn accrue(&self, node: NodeId, start: Date, end: Date) -> TallyResult<f64> {
        self.query(node, Query::Accrue(start, end), "accrue", |s| {
            s.accrue(start, end)
        })
    }

    /// Total paid by a payment node over `(start, end]`.
    pub fn over(&self, node: NodeId, start: Date, end: Date) -> TallyResult<f64> {
        self.query(node, Query::Over(start, end), "over", |s| s.over(start, end))
    }

    /// Balance of a balance node in effect at `date`.
    pub fn at(&self, node: NodeId, date: Date) -> TallyResult<f64> {
        self.query(node, Query::At(date), "at", |s| s.at(date))
    }

    /// Year-fraction weighted average of an accrual node over `[start, end)`.
    pub fn w_avg(&self, node: NodeId, start: Date, end: Date) -> TallyResult<f64> {
        self.query(node, Query::WAvg(start, end), "w_avg", |s| {
            s.w_avg(start, end)
        })
    }
}

pub(crate) fn any_view(inner: &Arc<ScopeInner>, node: NodeId, operation: &str) -> TallyResult<AnySeries> {
    let weak = Arc::downgrade(inner);
    match inner.model.kind(node) {
        Some(NodeKind::Series(SeriesKind::Accrual)) => Ok(AnySeries::Accrual(view(weak, node))),
        Some(NodeKind::Series(SeriesKind::Payment)) => Ok(AnySeries::Payment(view(weak, node))),
        Some(NodeKind::Series(SeriesKind::Balance)) => Ok(AnySeries::Balance(view(weak, node))),
        Some(NodeKind::Group) => Err(TallyError::undefined_operation(operation, "group")),
        None => Err(TallyError::Definition {
            node: node.to_string(),
            reason: "no such node".to_string(),
        }),
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("model", &self.inner.model)
            .finish_non_exhaustive()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let stats = self.stats();
        tracing::debug!(
            scope = self.inner.id,
            elements = stats.elements_produced,
            memo_hits = stats.memo_hits,
            query_hits = stats.query_hits,
            query_misses = stats.query_misses,
            definitions = stats.definitions_instantiated,
            "scope closed"
        );
        // Views may still hold values that keep the state alive; release it now.
        let guard = self.inner.state.lock();
        guard.replace(ScopeState::default());
    }
}
