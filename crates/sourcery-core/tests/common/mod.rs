//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use sourcery_core::config::{AnalysisConfig, NodeId, NodeKind};
use sourcery_core::graph::CallGraph;
use sourcery_core::output::{render, OutputFormat};
use sourcery_core::phases::discovery::run_discovery_phase;
use sourcery_core::phases::decoding::run_decoding_phase;
use sourcery_core::statement::{LogosTokenizer, MethodCallExtractor};

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

/// Config pointing at a fixture export tree, no enrichment inputs.
pub fn fixture_config(name: &str) -> AnalysisConfig {
    AnalysisConfig {
        source_root: fixture_path(name),
        ..Default::default()
    }
}

/// Config with every enrichment input the fixture ships.
pub fn enriched_fixture_config(name: &str) -> AnalysisConfig {
    let root = fixture_path(name);
    AnalysisConfig {
        modules_csv: Some(root.join("modules.csv")),
        usage_log_csv: Some(root.join("modudet.csv")),
        system_procedures_json: Some(root.join("special.json")),
        schema_json: Some(root.join("schema.json")),
        source_root: root,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Building export files
// ---------------------------------------------------------------------------

/// A `TXT,` block with the right byte count and its `XTX,` terminator.
pub fn txt(body: &str) -> String {
    format!("TXT,132,{},\n{}XTX,\n", body.len(), body)
}

/// Scratch export tree.
pub struct ExportTree {
    pub dir: TempDir,
}

impl ExportTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `rel` under the root, creating directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn config(&self) -> AnalysisConfig {
        AnalysisConfig {
            source_root: self.root().to_path_buf(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Phase runners
// ---------------------------------------------------------------------------

/// Run discovery and decoding, without enrichment.
pub fn decode_tree(config: &AnalysisConfig) -> CallGraph {
    let files = run_discovery_phase(config).unwrap();
    let mut graph = CallGraph::new();
    run_decoding_phase(&files, &MethodCallExtractor::new(LogosTokenizer), &mut graph).unwrap();
    graph
}

// ---------------------------------------------------------------------------
// Graph extractors
// ---------------------------------------------------------------------------

pub fn id(name: &str, kind: NodeKind) -> NodeId {
    NodeId::new(name, kind)
}

/// Sorted reference keys of one node.
pub fn ref_keys(graph: &CallGraph, node: &NodeId) -> Vec<String> {
    graph
        .get_node(node)
        .unwrap_or_else(|| panic!("no node {node}"))
        .refs_sorted()
        .iter()
        .map(|r| r.key())
        .collect()
}

pub fn rendered(graph: &CallGraph, format: OutputFormat) -> String {
    let mut out = Vec::new();
    render(graph, format, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// What a rendered graph says: node ids with their missing flag, and edges.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RenderedShape {
    pub nodes: BTreeSet<(String, bool)>,
    pub edges: BTreeSet<(String, String)>,
}

fn quoted_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let start = line.find(marker)? + marker.len();
    let rest = &line[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

pub fn parse_dot(text: &str) -> RenderedShape {
    let mut shape = RenderedShape::default();
    for line in text.lines().filter(|l| l.starts_with('\t')) {
        let line = line.trim();
        if let Some((from, to)) = line.split_once(" -> ") {
            shape.edges.insert((from.to_string(), to.to_string()));
        } else if let Some((id, _)) = line.split_once(' ') {
            // DOT only marks missing methods, in red.
            let missing = line.ends_with("fillcolor=\"red\"]");
            shape.nodes.insert((id.to_string(), missing));
        }
    }
    shape
}

pub fn parse_cypher(text: &str) -> RenderedShape {
    let mut shape = RenderedShape::default();
    for line in text.lines() {
        if line.contains("-[:") {
            let from = quoted_after(line, "(f:Node {id:\"").unwrap();
            let to = quoted_after(line, "(t:Node {id:\"").unwrap();
            shape.edges.insert((from.to_string(), to.to_string()));
        } else {
            let id = quoted_after(line, "(n:Node {id:\"").unwrap();
            shape
                .nodes
                .insert((id.to_string(), line.ends_with(":Missing;")));
        }
    }
    shape
}
