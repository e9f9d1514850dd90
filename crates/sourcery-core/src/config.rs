//! Core data types and configuration for Sourcery analysis.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kind of unit a graph node stands for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Export,
    Field,
    Form,
    Import,
    Index,
    Method,
    PublicProcedureLibrary,
    Process,
    PublicProcedure,
    Query,
    Report,
    Table,
    WorkArea,
    /// A `FIL,` record whose extension is not in the module table.
    Unknown,
}

impl NodeKind {
    /// Tag string used in ids and renderer output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Field => "field",
            Self::Form => "form",
            Self::Import => "import",
            Self::Index => "index",
            Self::Method => "method",
            Self::PublicProcedureLibrary => "public_procedure_library",
            Self::Process => "process",
            Self::PublicProcedure => "public_procedure",
            Self::Query => "query",
            Self::Report => "report",
            Self::Table => "table",
            Self::WorkArea => "work_area",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from a tag string. Accepts `-` in place of `_` so CLI input
    /// like `public-procedure` works.
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s.replace('-', "_").as_str() {
            "export" => Some(Self::Export),
            "field" => Some(Self::Field),
            "form" => Some(Self::Form),
            "import" => Some(Self::Import),
            "index" => Some(Self::Index),
            "method" => Some(Self::Method),
            "public_procedure_library" => Some(Self::PublicProcedureLibrary),
            "process" => Some(Self::Process),
            "public_procedure" => Some(Self::PublicProcedure),
            "query" => Some(Self::Query),
            "report" => Some(Self::Report),
            "table" => Some(Self::Table),
            "work_area" => Some(Self::WorkArea),
            _ => None,
        }
    }

    /// Module file extension → kind. Anything unrecognised is `Unknown`.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jcl" => Self::Method,
            "imp" => Self::Import,
            "exp" => Self::Export,
            "frm" => Self::Form,
            "qry" => Self::Query,
            "rep" => Self::Report,
            "ppl" => Self::PublicProcedureLibrary,
            _ => Self::Unknown,
        }
    }

    /// Schema kinds that come into existence merely by being referenced.
    pub fn is_implicit(&self) -> bool {
        matches!(self, Self::Table | Self::Field | Self::Index | Self::WorkArea)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a graph node: lower-cased name plus kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub name: String,
    pub kind: NodeKind,
}

impl NodeId {
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_lowercase(),
            kind,
        }
    }

    /// `name_kind`, the string all orderings and rendered ids derive from.
    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.kind.as_str())
    }

    /// Split a dotted module name (`Alpha.jcl`) into an id and its
    /// original-case label.
    pub fn from_module_name(full_name: &str) -> (Self, String) {
        let mut parts = full_name.split('.');
        let base = parts.next().unwrap_or_default();
        let kind = parts
            .next()
            .map(NodeKind::from_extension)
            .unwrap_or(NodeKind::Unknown);
        (Self::new(base, kind), base.to_string())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// One unit in the graph with its outgoing references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    /// Display name in its original casing.
    pub label: String,
    pub refs: HashSet<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            refs: HashSet::new(),
        }
    }

    /// Stand-in for a schema object known only through references.
    pub fn placeholder(id: NodeId) -> Self {
        let label = id.name.clone();
        Self::new(id, label)
    }

    pub fn add_ref(&mut self, name: &str, kind: NodeKind) {
        self.refs.insert(NodeId::new(name, kind));
    }

    /// References ordered by their id string.
    pub fn refs_sorted(&self) -> Vec<&NodeId> {
        let mut refs: Vec<&NodeId> = self.refs.iter().collect();
        refs.sort_by_cached_key(|r| r.key());
        refs
    }
}

/// Subdirectories of an export tree that hold module files.
pub const DEFAULT_SOURCE_DIRS: &[&str] = &[
    "Exports",
    "Forms",
    "Imports",
    "Methods",
    "Procedures",
    "Processes",
    "Queries",
    "Reports",
];

/// Configuration for an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub source_root: PathBuf,
    #[serde(default = "default_source_dirs")]
    pub source_dirs: Vec<String>,
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,
    /// Module directory extract (dotted name, logic id).
    pub modules_csv: Option<PathBuf>,
    /// Per-invocation usage log (date, logic id).
    pub usage_log_csv: Option<PathBuf>,
    #[serde(default = "default_usage_since")]
    pub usage_since: NaiveDate,
    pub system_procedures_json: Option<PathBuf>,
    pub schema_json: Option<PathBuf>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_source_dirs() -> Vec<String> {
    DEFAULT_SOURCE_DIRS.iter().map(|s| s.to_string()).collect()
}
fn default_file_suffix() -> String {
    ".txt".to_string()
}
fn default_usage_since() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            source_dirs: default_source_dirs(),
            file_suffix: default_file_suffix(),
            modules_csv: None,
            usage_log_csv: None,
            usage_since: default_usage_since(),
            system_procedures_json: None,
            schema_json: None,
            verbose: false,
            quiet: false,
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a JSON file; absent fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&content).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject combinations that can only be caught before decoding starts.
    pub fn validate(&self) -> Result<()> {
        match (&self.modules_csv, &self.usage_log_csv) {
            (Some(_), None) | (None, Some(_)) => Err(Error::IncompleteUsageHistory {
                modules: self.modules_csv.is_some(),
                usage_log: self.usage_log_csv.is_some(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_roundtrip() {
        for kind in [
            NodeKind::Export,
            NodeKind::Method,
            NodeKind::PublicProcedure,
            NodeKind::PublicProcedureLibrary,
            NodeKind::WorkArea,
        ] {
            assert_eq!(NodeKind::from_str_value(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn node_kind_accepts_dashed_names() {
        assert_eq!(
            NodeKind::from_str_value("public-procedure"),
            Some(NodeKind::PublicProcedure)
        );
        assert_eq!(NodeKind::from_str_value("unknown"), None);
    }

    #[test]
    fn extension_table() {
        assert_eq!(NodeKind::from_extension("JCL"), NodeKind::Method);
        assert_eq!(NodeKind::from_extension("ppl"), NodeKind::PublicProcedureLibrary);
        assert_eq!(NodeKind::from_extension("rep"), NodeKind::Report);
        assert_eq!(NodeKind::from_extension("txt"), NodeKind::Unknown);
    }

    #[test]
    fn only_schema_kinds_are_implicit() {
        assert!(NodeKind::Table.is_implicit());
        assert!(NodeKind::WorkArea.is_implicit());
        assert!(!NodeKind::Method.is_implicit());
        assert!(!NodeKind::PublicProcedure.is_implicit());
    }

    #[test]
    fn node_id_lowercases_name() {
        let id = NodeId::new("CustMaint", NodeKind::Form);
        assert_eq!(id.name, "custmaint");
        assert_eq!(id.key(), "custmaint_form");
    }

    #[test]
    fn module_name_split_keeps_label_case() {
        let (id, label) = NodeId::from_module_name("ALPHA.JCL");
        assert_eq!(id, NodeId::new("alpha", NodeKind::Method));
        assert_eq!(label, "ALPHA");

        let (id, _) = NodeId::from_module_name("noext");
        assert_eq!(id.kind, NodeKind::Unknown);
    }

    #[test]
    fn refs_sorted_by_key() {
        let mut node = Node::new(NodeId::new("a", NodeKind::Method), "A");
        node.add_ref("zed", NodeKind::Method);
        node.add_ref("b", NodeKind::Table);
        node.add_ref("b", NodeKind::Field);
        let keys: Vec<String> = node.refs_sorted().iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["b_field", "b_table", "zed_method"]);
    }

    #[test]
    fn config_defaults() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.source_dirs.len(), 8);
        assert_eq!(cfg.file_suffix, ".txt");
        assert_eq!(cfg.usage_since, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn config_from_partial_json() {
        let cfg: AnalysisConfig =
            serde_json::from_str(r#"{"source_root": "/exports", "usage_since": "2023-06-30"}"#)
                .unwrap();
        assert_eq!(cfg.source_root, PathBuf::from("/exports"));
        assert_eq!(cfg.usage_since, NaiveDate::from_ymd_opt(2023, 6, 30).unwrap());
        assert_eq!(cfg.file_suffix, ".txt");
        assert!(cfg.modules_csv.is_none());
    }

    #[test]
    fn validate_rejects_half_history() {
        let cfg = AnalysisConfig {
            modules_csv: Some(PathBuf::from("modules.csv")),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(Error::IncompleteUsageHistory {
                modules: true,
                usage_log: false
            })
        ));

        let both = AnalysisConfig {
            modules_csv: Some(PathBuf::from("modules.csv")),
            usage_log_csv: Some(PathBuf::from("modudet.csv")),
            ..Default::default()
        };
        assert!(both.validate().is_ok());
        assert!(AnalysisConfig::default().validate().is_ok());
    }
}
