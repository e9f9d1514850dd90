//! petgraph view of a [`CallGraph`] for structural reports.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use crate::config::{Node, NodeId, NodeKind};
use crate::graph::call_graph::CallGraph;

/// Kinds that can start a chain of calls and so are worth reporting
/// when nothing reaches them.
const ENTRY_KINDS: &[NodeKind] = &[
    NodeKind::Method,
    NodeKind::Form,
    NodeKind::Report,
    NodeKind::PublicProcedure,
    NodeKind::Query,
    NodeKind::Import,
    NodeKind::Export,
    NodeKind::Process,
];

/// Directed graph over the nodes that exist. References to missing
/// targets have no edge.
pub struct Topology {
    graph: DiGraph<NodeId, ()>,
    id_index: HashMap<NodeId, NodeIndex>,
}

impl Topology {
    pub fn build(call_graph: &CallGraph) -> Self {
        let mut graph = DiGraph::new();
        let mut id_index = HashMap::new();

        for node in call_graph.nodes_sorted() {
            let idx = graph.add_node(node.id.clone());
            id_index.insert(node.id.clone(), idx);
        }
        for node in call_graph.nodes_sorted() {
            let from = id_index[&node.id];
            for target in node.refs_sorted() {
                if let Some(&to) = id_index.get(target) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { graph, id_index }
    }

    /// Ids of existing nodes that reference `id`.
    pub fn callers(&self, id: &NodeId) -> Vec<&NodeId> {
        self.neighbours(id, Direction::Incoming)
    }

    /// Ids of existing nodes `id` references.
    pub fn callees(&self, id: &NodeId) -> Vec<&NodeId> {
        self.neighbours(id, Direction::Outgoing)
    }

    fn neighbours(&self, id: &NodeId, dir: Direction) -> Vec<&NodeId> {
        let Some(&idx) = self.id_index.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<&NodeId> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| match dir {
                Direction::Incoming => e.source(),
                Direction::Outgoing => e.target(),
            })
            .filter_map(|i| self.graph.node_weight(i))
            .collect();
        ids.sort_by_cached_key(|i| i.key());
        ids.dedup();
        ids
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Entry-kind nodes nothing references and nothing marked used.
/// A self reference does not count as being reached.
pub fn orphans(call_graph: &CallGraph) -> Vec<&Node> {
    let topology = Topology::build(call_graph);
    call_graph
        .nodes_sorted()
        .into_iter()
        .filter(|n| ENTRY_KINDS.contains(&n.id.kind))
        .filter(|n| !call_graph.is_used(&n.id))
        .filter(|n| topology.callers(&n.id).iter().all(|c| **c == n.id))
        .collect()
}

/// A reference to a method with no node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCall<'a> {
    pub from: &'a Node,
    pub to: &'a NodeId,
}

impl std::fmt::Display for MissingCall<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} calls missing method {}", self.from.label, self.to.name)
    }
}

/// Method references whose target does not exist, ordered by caller then
/// target.
pub fn missing_method_calls(call_graph: &CallGraph) -> Vec<MissingCall<'_>> {
    call_graph
        .nodes_sorted()
        .into_iter()
        .flat_map(|from| {
            from.refs_sorted()
                .into_iter()
                .filter(|r| r.kind == NodeKind::Method && !call_graph.has_node(r))
                .map(move |to| MissingCall { from, to })
        })
        .collect()
}
