//! In-memory reference graph keyed by [`NodeId`].

use std::collections::{HashMap, HashSet};

use crate::config::{Node, NodeId, NodeKind};
use crate::record::DecodedFile;

/// Node table plus the orthogonal `used` annotation.
///
/// A node inserted under an existing id replaces the earlier one. `used`
/// never implies existence: an id may be marked without being a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    nodes: HashMap<NodeId, Node>,
    used: HashSet<NodeId>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `node`. Schema objects it references are
    /// synthesised if absent and marked used either way.
    pub fn add_node(&mut self, node: Node) {
        let implicit: Vec<NodeId> = node
            .refs
            .iter()
            .filter(|r| r.kind.is_implicit())
            .cloned()
            .collect();
        self.nodes.insert(node.id.clone(), node);

        for referenced in implicit {
            self.nodes
                .entry(referenced.clone())
                .or_insert_with(|| Node::placeholder(referenced.clone()));
            self.used.insert(referenced);
        }
    }

    /// Apply everything one file decoded to.
    pub fn apply(&mut self, decoded: DecodedFile) {
        for node in decoded.nodes {
            self.add_node(node);
        }
        self.used.extend(decoded.used);
    }

    pub fn mark_used(&mut self, id: NodeId) {
        self.used.insert(id);
    }

    /// Get the node for `id`, creating an empty one labelled `label` if absent.
    pub fn ensure_node(&mut self, id: NodeId, label: &str) -> &mut Node {
        self.nodes
            .entry(id.clone())
            .or_insert_with(|| Node::new(id, label))
    }

    /// Add `from → to` if `from` exists. Returns whether a node was updated.
    pub fn add_reference(&mut self, from: &NodeId, to: NodeId) -> bool {
        match self.nodes.get_mut(from) {
            Some(node) => {
                node.refs.insert(to);
                true
            }
            None => false,
        }
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_used(&self, id: &NodeId) -> bool {
        self.used.contains(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All nodes ordered by `(label, id key)`.
    pub fn nodes_sorted(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by_cached_key(|n| (n.label.clone(), n.id.key()));
        nodes
    }

    /// Labels-ordered nodes of one kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<&Node> {
        self.nodes_sorted()
            .into_iter()
            .filter(|n| n.id.kind == kind)
            .collect()
    }

    /// Distinct reference targets with no node, ordered by name then key.
    pub fn missing_refs(&self) -> Vec<NodeId> {
        let missing: HashSet<&NodeId> = self
            .nodes
            .values()
            .flat_map(|n| n.refs.iter())
            .filter(|r| !self.nodes.contains_key(*r))
            .collect();
        let mut missing: Vec<NodeId> = missing.into_iter().cloned().collect();
        missing.sort_by_cached_key(|id| (id.name.clone(), id.key()));
        missing
    }

    // --- Counts ---

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn reference_count(&self) -> usize {
        self.nodes.values().map(|n| n.refs.len()).sum()
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }
}
