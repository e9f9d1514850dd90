//! Graph serialisation.
//!
//! [`write_graph`] walks the graph in a fixed order and drives a
//! [`GraphRenderer`]; renderers only format what they are handed.

pub mod cypher;
pub mod dot;

use std::collections::HashSet;
use std::io::{self, Write};

use crate::config::NodeId;
use crate::graph::CallGraph;

pub use cypher::CypherRenderer;
pub use dot::DotRenderer;

/// Tag added to nodes with a `used` mark.
pub const USED_TAG: &str = "used";
/// Tag added to reference targets with no node.
pub const MISSING_TAG: &str = "missing";

/// Output format of the `graph` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Dot,
    Cypher,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Cypher => "cypher",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dot" => Some(Self::Dot),
            "cypher" | "neo" => Some(Self::Cypher),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives the graph in traversal order.
pub trait GraphRenderer {
    fn start(&mut self) -> io::Result<()>;
    fn add_node(&mut self, id: &NodeId, label: &str, tags: &[&str]) -> io::Result<()>;
    fn add_reference(&mut self, from: &NodeId, to: &NodeId) -> io::Result<()>;
    fn end(&mut self) -> io::Result<()>;
}

/// Identifier safe for both output formats: `a_` plus the id key with
/// everything outside `[A-Za-z0-9]` replaced by `_`.
pub fn sanitise_id(id: &NodeId) -> String {
    let key = id.key();
    let mut out = String::with_capacity(key.len() + 2);
    out.push_str("a_");
    out.extend(
        key.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
    );
    out
}

/// Escape a label for a double-quoted string in either format.
pub(crate) fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Walk `graph` and feed it to `renderer`.
///
/// Nodes are visited by `(label, id key)`, then every node's references by
/// target key, then references with no target node, by name, as extra
/// nodes tagged `missing`.
pub fn write_graph(graph: &CallGraph, renderer: &mut dyn GraphRenderer) -> io::Result<()> {
    renderer.start()?;

    let nodes = graph.nodes_sorted();
    for node in &nodes {
        let mut tags = vec![node.id.kind.as_str()];
        if graph.is_used(&node.id) {
            tags.push(USED_TAG);
        }
        renderer.add_node(&node.id, &node.label, &tags)?;
    }

    let mut missing: HashSet<&NodeId> = HashSet::new();
    for node in &nodes {
        for target in node.refs_sorted() {
            renderer.add_reference(&node.id, target)?;
            if !graph.has_node(target) {
                missing.insert(target);
            }
        }
    }

    let mut missing: Vec<&NodeId> = missing.into_iter().collect();
    missing.sort_by_cached_key(|id| (id.name.clone(), id.key()));
    for id in missing {
        renderer.add_node(id, &id.name, &[id.kind.as_str(), MISSING_TAG])?;
    }

    renderer.end()
}

/// Render `graph` in `format` to `out`.
pub fn render<W: Write>(graph: &CallGraph, format: OutputFormat, out: W) -> io::Result<()> {
    match format {
        OutputFormat::Dot => {
            let mut renderer = DotRenderer::new(out);
            write_graph(graph, &mut renderer)?;
            renderer.into_inner().flush()
        }
        OutputFormat::Cypher => {
            let mut renderer = CypherRenderer::new(out);
            write_graph(graph, &mut renderer)?;
            renderer.into_inner().flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Node, NodeKind};
    use pretty_assertions::assert_eq;

    /// Records calls instead of formatting them.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl GraphRenderer for Recorder {
        fn start(&mut self) -> io::Result<()> {
            self.events.push("start".into());
            Ok(())
        }
        fn add_node(&mut self, id: &NodeId, label: &str, tags: &[&str]) -> io::Result<()> {
            self.events
                .push(format!("node {} {label} [{}]", id.key(), tags.join(",")));
            Ok(())
        }
        fn add_reference(&mut self, from: &NodeId, to: &NodeId) -> io::Result<()> {
            self.events.push(format!("ref {} {}", from.key(), to.key()));
            Ok(())
        }
        fn end(&mut self) -> io::Result<()> {
            self.events.push("end".into());
            Ok(())
        }
    }

    #[test]
    fn sanitise_replaces_non_alphanumerics() {
        let id = NodeId::new("Cust-Maint.v2", NodeKind::PublicProcedure);
        assert_eq!(sanitise_id(&id), "a_cust_maint_v2_public_procedure");
    }

    #[test]
    fn traversal_order_and_tags() {
        let mut g = CallGraph::new();
        let mut foo = Node::new(NodeId::new("foo", NodeKind::Method), "Foo");
        foo.add_ref("zed", NodeKind::Method);
        foo.add_ref("Cust", NodeKind::Table);
        foo.add_ref("abc", NodeKind::Method);
        g.add_node(foo);
        g.add_node(Node::new(NodeId::new("bar", NodeKind::Form), "Bar"));

        let mut rec = Recorder::default();
        write_graph(&g, &mut rec).unwrap();
        assert_eq!(
            rec.events,
            vec![
                "start",
                "node bar_form Bar [form]",
                "node foo_method Foo [method]",
                "node cust_table cust [table,used]",
                "ref foo_method abc_method",
                "ref foo_method cust_table",
                "ref foo_method zed_method",
                "node abc_method abc [method,missing]",
                "node zed_method zed [method,missing]",
                "end",
            ]
        );
    }

    #[test]
    fn missing_target_reported_once() {
        let mut g = CallGraph::new();
        for name in ["a", "b"] {
            let mut n = Node::new(NodeId::new(name, NodeKind::Method), name);
            n.add_ref("gone", NodeKind::Method);
            g.add_node(n);
        }
        let mut rec = Recorder::default();
        write_graph(&g, &mut rec).unwrap();
        let missing = rec.events.iter().filter(|e| e.ends_with("[method,missing]")).count();
        assert_eq!(missing, 1);
    }

    #[test]
    fn format_names() {
        assert_eq!(OutputFormat::from_str_value("DOT"), Some(OutputFormat::Dot));
        assert_eq!(OutputFormat::from_str_value("neo"), Some(OutputFormat::Cypher));
        assert_eq!(OutputFormat::from_str_value("svg"), None);
        assert_eq!(OutputFormat::Cypher.to_string(), "cypher");
    }
}
