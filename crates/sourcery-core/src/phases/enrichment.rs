//! Phase 3: usage and schema data from outside the export tree.
//!
//! Runs once every file has been decoded. The optional passes run in a
//! fixed order (usage history, system procedures, schema) and the
//! index→table closure always runs last.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::{AnalysisConfig, NodeId, NodeKind};
use crate::error::{Error, Result};
use crate::graph::CallGraph;

/// Module directory columns.
const MODULE_NAME_COL: usize = 0;
const MODULE_ID_COL: usize = 6;
/// Usage log columns.
const USAGE_DATE_COL: usize = 0;
const USAGE_ID_COL: usize = 13;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Counts of what each pass contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub history_used: usize,
    pub system_procedures: usize,
    pub schema_tables: usize,
    pub index_table_links: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemProcedures {
    #[serde(default)]
    system_procedures: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SchemaTable {
    name: String,
    #[serde(default)]
    fields: Vec<SchemaItem>,
    #[serde(default)]
    indexes: Vec<SchemaItem>,
}

#[derive(Debug, Deserialize)]
struct SchemaItem {
    name: String,
}

/// Run every configured pass, then the closure.
pub fn run_enrichment_phase(
    config: &AnalysisConfig,
    graph: &mut CallGraph,
) -> Result<EnrichmentStats> {
    config.validate()?;
    let mut stats = EnrichmentStats::default();

    if let (Some(modules), Some(usage_log)) = (&config.modules_csv, &config.usage_log_csv) {
        stats.history_used = apply_usage_history(graph, modules, usage_log, config.usage_since)?;
    }
    if let Some(path) = &config.system_procedures_json {
        stats.system_procedures = apply_system_procedures(graph, path)?;
    }
    if let Some(path) = &config.schema_json {
        stats.schema_tables = apply_schema(graph, path)?;
    }
    stats.index_table_links = link_index_tables(graph);

    log::info!(
        "enrichment: {} used from history, {} system procedures, {} schema tables, {} index→table links",
        stats.history_used,
        stats.system_procedures,
        stats.schema_tables,
        stats.index_table_links
    );
    Ok(stats)
}

// ============================================================================
// Usage history
// ============================================================================

fn csv_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn column<'r>(path: &Path, record: &'r csv::StringRecord, column: usize) -> Result<&'r str> {
    record.get(column).map(str::trim).ok_or_else(|| Error::MissingColumn {
        path: path.to_path_buf(),
        column,
        line: record.position().map(|p| p.line()).unwrap_or_default(),
    })
}

/// Logic id → dotted module name.
pub fn load_module_directory(path: &Path) -> Result<HashMap<String, String>> {
    let mut reader = csv_reader(path)?;
    let mut modules = HashMap::new();
    for record in reader.records() {
        let record = record.map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let name = column(path, &record, MODULE_NAME_COL)?;
        let id = column(path, &record, MODULE_ID_COL)?;
        modules.insert(id.to_string(), name.to_string());
    }
    Ok(modules)
}

/// Logic ids invoked on or after `since`.
pub fn load_invoked_ids(path: &Path, since: NaiveDate) -> Result<HashSet<String>> {
    let mut reader = csv_reader(path)?;
    let mut invoked = HashSet::new();
    for record in reader.records() {
        let record = record.map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let raw_date = column(path, &record, USAGE_DATE_COL)?;
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|source| {
            Error::InvalidDate {
                path: path.to_path_buf(),
                value: raw_date.to_string(),
                source,
            }
        })?;
        if date >= since {
            invoked.insert(column(path, &record, USAGE_ID_COL)?.to_string());
        }
    }
    Ok(invoked)
}

/// Mark every module invoked since `since` as used. Returns how many ids
/// were marked.
pub fn apply_usage_history(
    graph: &mut CallGraph,
    modules_csv: &Path,
    usage_log_csv: &Path,
    since: NaiveDate,
) -> Result<usize> {
    let modules = load_module_directory(modules_csv)?;
    let mut invoked: Vec<String> = load_invoked_ids(usage_log_csv, since)?.into_iter().collect();
    invoked.sort();

    let mut marked = 0;
    for id in invoked {
        let name = modules
            .get(&id)
            .ok_or_else(|| Error::UnknownModuleId(id.clone()))?;
        if !name.contains('.') {
            log::warn!("module '{name}' (id {id}) has a truncated name - skipping");
            continue;
        }
        let (node_id, _) = NodeId::from_module_name(name);
        if node_id.kind == NodeKind::Unknown {
            log::warn!("module '{name}' (id {id}) has an unknown type - skipping");
            continue;
        }
        graph.mark_used(node_id);
        marked += 1;
    }
    Ok(marked)
}

// ============================================================================
// Declarative documents
// ============================================================================

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Mark every listed system procedure as used.
pub fn apply_system_procedures(graph: &mut CallGraph, path: &Path) -> Result<usize> {
    let doc: SystemProcedures = read_json(path)?;
    for name in &doc.system_procedures {
        graph.mark_used(NodeId::new(name, NodeKind::PublicProcedure));
    }
    Ok(doc.system_procedures.len())
}

/// Make sure every table in the schema dump exists, with its indexes and
/// fields referencing it.
pub fn apply_schema(graph: &mut CallGraph, path: &Path) -> Result<usize> {
    let tables: Vec<SchemaTable> = read_json(path)?;
    for table in &tables {
        let table_id = NodeId::new(&table.name, NodeKind::Table);
        graph.ensure_node(table_id.clone(), &table.name);

        let members = table
            .indexes
            .iter()
            .map(|i| (i, NodeKind::Index))
            .chain(table.fields.iter().map(|f| (f, NodeKind::Field)));
        for (item, kind) in members {
            graph
                .ensure_node(NodeId::new(&item.name, kind), &item.name)
                .refs
                .insert(table_id.clone());
        }
    }
    Ok(tables.len())
}

// ============================================================================
// Index → table closure
// ============================================================================

/// For every `N → index → table` path add `N → table`. One hop only.
/// Returns the number of references added.
pub fn link_index_tables(graph: &mut CallGraph) -> usize {
    let mut links: Vec<(NodeId, NodeId)> = Vec::new();
    for node in graph.nodes_sorted() {
        for index in node.refs.iter().filter(|r| r.kind == NodeKind::Index) {
            let Some(index_node) = graph.get_node(index) else {
                continue;
            };
            for table in index_node.refs.iter().filter(|r| r.kind == NodeKind::Table) {
                if !node.refs.contains(table) {
                    links.push((node.id.clone(), table.clone()));
                }
            }
        }
    }

    let mut added = 0;
    for (from, table) in links {
        if graph.get_node(&from).is_some_and(|n| !n.refs.contains(&table))
            && graph.add_reference(&from, table)
        {
            added += 1;
        }
    }
    added
}
