//! Error type shared by every phase of the analysis.

use std::path::PathBuf;

use crate::config::NodeKind;

/// Everything that can abort an analysis run.
///
/// All variants are fatal: a run that hits one of them produces no graph.
/// Recoverable conditions (unknown record tags, dynamic method targets,
/// truncated module names) are logged instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source root {0} is not a directory")]
    SourceRootNotFound(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("malformed TXT length '{value}' in {file}")]
    MalformedLength { file: String, value: String },

    #[error("truncated TXT body in {file}: expected {expected} bytes, got {actual}")]
    TruncatedText {
        file: String,
        expected: usize,
        actual: usize,
    },

    #[error("expected XTX record after TXT body in {file}, got '{found}'")]
    MissingTextTerminator { file: String, found: String },

    #[error("public procedure '{procedure}' defined outside a public procedure library ({kind}) in {file}")]
    ProcedureOutsideLibrary {
        file: String,
        procedure: String,
        kind: NodeKind,
    },

    #[error("public procedure library header in {file} carries {count} reference(s) before its first procedure")]
    LibraryHeaderHasReferences { file: String, count: usize },

    #[error("unhandled execute statement in {unit}: keyword '{keyword}' in '{statement}'")]
    UnhandledStatement {
        unit: String,
        keyword: String,
        statement: String,
    },

    #[error("module CSV files must both be provided (modules: {modules}, usage log: {usage_log})")]
    IncompleteUsageHistory { modules: bool, usage_log: bool },

    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("missing column {column} on line {line} of {path}")]
    MissingColumn {
        path: PathBuf,
        column: usize,
        line: u64,
    },

    #[error("invalid date '{value}' in {path}: {source}")]
    InvalidDate {
        path: PathBuf,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("usage log references unknown module with logic id {0}")]
    UnknownModuleId(String),

    #[error("failed to decode JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
