//! Static dependency graph between series nodes.
//!
//! Edges run from a dependency to the node that reads it. Only edges of
//! [`Dependency::Current`] take part in cycle detection: a loop closed by a
//! lagged read is a well-founded recurrence, not a cycle.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use petgraph::Direction;

use crate::item::Dependency;
use crate::model::NodeId;

/// Timing of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeTiming {
    Current,
    Lagged,
}

/// Dependency graph over the series nodes of a model.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    graph: DiGraph<NodeId, EdgeTiming>,
    indices: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn index(&mut self, node: NodeId) -> NodeIndex {
        if let Some(idx) = self.indices.get(&node) {
            return *idx;
        }
        let idx = self.graph.add_node(node);
        self.indices.insert(node, idx);
        idx
    }

    /// Registers `node` and its declared reads.
    pub(crate) fn add(&mut self, node: NodeId, dependencies: &[Dependency]) {
        let target = self.index(node);
        for dependency in dependencies {
            let source = self.index(dependency.node());
            let timing = if dependency.is_lagged() {
                EdgeTiming::Lagged
            } else {
                EdgeTiming::Current
            };
            match self.graph.find_edge(source, target) {
                // A same-date read of a node also read with a lag keeps the edge current.
                Some(edge) if timing == EdgeTiming::Current => self.graph[edge] = timing,
                Some(_) => {}
                None => {
                    self.graph.add_edge(source, target, timing);
                }
            }
        }
    }

    /// Returns one cycle of same-date dependencies, if any exists.
    ///
    /// The cycle starts at its lowest node id, each node reads the next one,
    /// and the first node is repeated at the end.
    pub(crate) fn find_cycle(&self) -> Option<Vec<NodeId>> {
        let current = EdgeFiltered::from_fn(&self.graph, |edge| {
            *edge.weight() == EdgeTiming::Current
        });

        tarjan_scc(&current).into_iter().find_map(|component| {
            let self_loop = component.len() == 1
                && self
                    .graph
                    .edges_connecting(component[0], component[0])
                    .any(|edge| *edge.weight() == EdgeTiming::Current);
            (component.len() > 1 || self_loop).then(|| self.cycle_within(&component))
        })
    }

    /// Walks same-date reads inside a strongly connected component back to
    /// its lowest node, returning the shortest such loop.
    fn cycle_within(&self, component: &[NodeIndex]) -> Vec<NodeId> {
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let Some(start) = component.iter().copied().min_by_key(|idx| self.graph[*idx]) else {
            return Vec::new();
        };

        let mut reached_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        while let Some(at) = queue.pop_front() {
            let mut reads: Vec<NodeIndex> = self
                .graph
                .edges_directed(at, Direction::Incoming)
                .filter(|edge| *edge.weight() == EdgeTiming::Current)
                .map(|edge| edge.source())
                .filter(|idx| members.contains(idx))
                .collect();
            reads.sort_by_key(|idx| self.graph[*idx]);

            for next in reads {
                if next == start {
                    let mut trail = Vec::new();
                    let mut cursor = at;
                    while cursor != start {
                        trail.push(self.graph[cursor]);
                        match reached_from.get(&cursor) {
                            Some(previous) => cursor = *previous,
                            None => break,
                        }
                    }
                    let first = self.graph[start];
                    let mut cycle = vec![first];
                    cycle.extend(trail.into_iter().rev());
                    cycle.push(first);
                    return cycle;
                }
                if !reached_from.contains_key(&next) {
                    reached_from.insert(next, at);
                    queue.push_back(next);
                }
            }
        }
        Vec::new()
    }

    /// Nodes that `node` reads.
    pub(crate) fn dependencies_of(&self, node: NodeId) -> Vec<NodeId> {
        self.neighbors(node, Direction::Incoming)
    }

    /// Nodes that read `node`.
    pub(crate) fn dependents_of(&self, node: NodeId) -> Vec<NodeId> {
        self.neighbors(node, Direction::Outgoing)
    }

    fn neighbors(&self, node: NodeId, direction: Direction) -> Vec<NodeId> {
        let Some(idx) = self.indices.get(&node) else {
            return Vec::new();
        };
        let mut nodes: Vec<NodeId> = self
            .graph
            .neighbors_directed(*idx, direction)
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Series nodes ordered so that every same-date dependency comes first.
    ///
    /// Returns `None` if the same-date edges contain a cycle.
    pub(crate) fn evaluation_order(&self) -> Option<Vec<NodeId>> {
        let current = EdgeFiltered::from_fn(&self.graph, |edge| {
            *edge.weight() == EdgeTiming::Current
        });
        let sorted = toposort(&current, None).ok()?;
        Some(
            sorted
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).copied())
                .collect(),
        )
    }
}
