//! Graphviz `digraph` renderer.

use std::io::{self, Write};

use crate::config::NodeId;
use crate::output::{escape_label, sanitise_id, GraphRenderer, MISSING_TAG};

/// Fill colour for a node given its tags.
fn fill_colour(tags: &[&str]) -> &'static str {
    let has = |t: &str| tags.contains(&t);
    if has("form") {
        "lightgreen"
    } else if has("report") {
        "orange"
    } else if has("public_procedure") {
        "yellow"
    } else if has("method") {
        if has(MISSING_TAG) {
            "red"
        } else {
            "lightblue"
        }
    } else {
        ""
    }
}

pub struct DotRenderer<W> {
    out: W,
}

impl<W: Write> DotRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> GraphRenderer for DotRenderer<W> {
    fn start(&mut self) -> io::Result<()> {
        writeln!(self.out, "digraph calls {{")
    }

    fn add_node(&mut self, id: &NodeId, label: &str, tags: &[&str]) -> io::Result<()> {
        writeln!(
            self.out,
            "\t{} [label=\"{}\" style=\"filled\" fillcolor=\"{}\"]",
            sanitise_id(id),
            escape_label(label),
            fill_colour(tags)
        )
    }

    fn add_reference(&mut self, from: &NodeId, to: &NodeId) -> io::Result<()> {
        writeln!(self.out, "\t{} -> {}", sanitise_id(from), sanitise_id(to))
    }

    fn end(&mut self) -> io::Result<()> {
        writeln!(self.out, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeKind;
    use pretty_assertions::assert_eq;

    fn rendered(f: impl FnOnce(&mut DotRenderer<Vec<u8>>) -> io::Result<()>) -> String {
        let mut r = DotRenderer::new(Vec::new());
        f(&mut r).unwrap();
        String::from_utf8(r.into_inner()).unwrap()
    }

    #[test]
    fn colours_by_kind() {
        assert_eq!(fill_colour(&["form", "used"]), "lightgreen");
        assert_eq!(fill_colour(&["report"]), "orange");
        assert_eq!(fill_colour(&["public_procedure", "missing"]), "yellow");
        assert_eq!(fill_colour(&["method"]), "lightblue");
        assert_eq!(fill_colour(&["method", "missing"]), "red");
        assert_eq!(fill_colour(&["table", "used"]), "");
    }

    #[test]
    fn node_and_edge_lines() {
        let foo = NodeId::new("foo", NodeKind::Method);
        let bar = NodeId::new("bar", NodeKind::Method);
        let out = rendered(|r| {
            r.start()?;
            r.add_node(&foo, "Foo \"main\"", &["method"])?;
            r.add_reference(&foo, &bar)?;
            r.end()
        });
        assert_eq!(
            out,
            "digraph calls {\n\
             \ta_foo_method [label=\"Foo \\\"main\\\"\" style=\"filled\" fillcolor=\"lightblue\"]\n\
             \ta_foo_method -> a_bar_method\n\
             }\n"
        );
    }
}
