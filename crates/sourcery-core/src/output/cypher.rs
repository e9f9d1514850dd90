//! Cypher upsert script renderer.
//!
//! Every statement is a `MERGE`, so the script can be replayed against a
//! database that already holds an earlier export.

use std::io::{self, Write};

use crate::config::{NodeId, NodeKind};
use crate::output::{escape_label, sanitise_id, GraphRenderer};

/// `public_procedure` → `PublicProcedure`.
fn upper_camel(tag: &str) -> String {
    tag.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Relationship type for an edge ending at `to`.
fn relationship(to: &NodeId) -> &'static str {
    match to.kind {
        NodeKind::Method | NodeKind::PublicProcedure => "calls",
        _ => "references",
    }
}

pub struct CypherRenderer<W> {
    out: W,
}

impl<W: Write> CypherRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> GraphRenderer for CypherRenderer<W> {
    fn start(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn add_node(&mut self, id: &NodeId, label: &str, tags: &[&str]) -> io::Result<()> {
        let labels: String = tags.iter().map(|t| format!(":{}", upper_camel(t))).collect();
        writeln!(
            self.out,
            "MERGE (n:Node {{id:\"{}\"}}) SET n.name=\"{}\" SET n{};",
            sanitise_id(id),
            escape_label(label),
            labels
        )
    }

    fn add_reference(&mut self, from: &NodeId, to: &NodeId) -> io::Result<()> {
        writeln!(
            self.out,
            "MERGE (f:Node {{id:\"{}\"}}) MERGE (t:Node {{id:\"{}\"}}) MERGE (f)-[:{}]->(t);",
            sanitise_id(from),
            sanitise_id(to),
            relationship(to)
        )
    }

    fn end(&mut self) -> io::Result<()> {
        Ok(())
    }
}
