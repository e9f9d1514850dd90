//! Enrichment phase integration tests.

mod common;

use common::*;
use pretty_assertions::assert_eq;

use chrono::NaiveDate;
use sourcery_core::config::{AnalysisConfig, NodeKind};
use sourcery_core::error::Error;
use sourcery_core::phases::enrichment::{link_index_tables, run_enrichment_phase};

// ===========================================================================
// Fixture enrichment inputs
// ===========================================================================

#[test]
fn fixture_history_and_allow_list() {
    let config = enriched_fixture_config("export_simple");
    let mut graph = decode_tree(&config);
    let stats = run_enrichment_phase(&config, &mut graph).unwrap();

    assert_eq!(stats.history_used, 1);
    assert_eq!(stats.system_procedures, 1);
    assert!(graph.is_used(&id("sales", NodeKind::Report)));
    assert!(graph.is_used(&id("unused", NodeKind::PublicProcedure)));
    // Main's only usage row is before the cutoff.
    assert!(!graph.is_used(&id("main", NodeKind::Form)));
}

#[test]
fn fixture_schema_and_closure() {
    let config = enriched_fixture_config("export_simple");
    let mut graph = decode_tree(&config);
    let stats = run_enrichment_phase(&config, &mut graph).unwrap();

    assert_eq!(stats.schema_tables, 1);
    assert_eq!(stats.index_table_links, 1);
    assert_eq!(
        ref_keys(&graph, &id("bycust", NodeKind::Index)),
        vec!["cust_table"]
    );
    assert_eq!(
        ref_keys(&graph, &id("name", NodeKind::Field)),
        vec!["cust_table"]
    );
    assert_eq!(
        ref_keys(&graph, &id("main", NodeKind::Form)),
        vec!["bycust_index", "cust_table", "worker_method"]
    );
    assert!(ref_keys(&graph, &id("cust", NodeKind::Table)).is_empty());
}

#[test]
fn earlier_cutoff_picks_up_older_rows() {
    let mut config = enriched_fixture_config("export_simple");
    config.usage_since = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut graph = decode_tree(&config);
    run_enrichment_phase(&config, &mut graph).unwrap();
    assert!(graph.is_used(&id("main", NodeKind::Form)));
}

// ===========================================================================
// Usage history scenarios
// ===========================================================================

fn usage_tree(rows: &[(&str, &str)]) -> (ExportTree, AnalysisConfig) {
    let tree = ExportTree::new();
    tree.write("Methods/alpha.jc@.txt", "FIL,130,Alpha.jcl\n");
    let modules = tree.write(
        "data/modules.csv",
        "name,a,b,c,d,e,id\nALPHA.JCL,,,,,,42\n",
    );
    let mut log = String::from("date,1,2,3,4,5,6,7,8,9,10,11,12,id\n");
    for (date, logic_id) in rows {
        log.push_str(&format!("{date},,,,,,,,,,,,,{logic_id}\n"));
    }
    let usage = tree.write("data/modudet.csv", &log);

    let config = AnalysisConfig {
        modules_csv: Some(modules),
        usage_log_csv: Some(usage),
        ..tree.config()
    };
    (tree, config)
}

#[test]
fn one_recent_row_is_enough() {
    let (_tree, config) = usage_tree(&[("2024-06-01", "42"), ("2023-06-01", "42")]);
    let mut graph = decode_tree(&config);
    run_enrichment_phase(&config, &mut graph).unwrap();
    assert!(graph.is_used(&id("alpha", NodeKind::Method)));
}

#[test]
fn old_row_alone_is_not_enough() {
    let (_tree, config) = usage_tree(&[("2023-06-01", "42")]);
    let mut graph = decode_tree(&config);
    run_enrichment_phase(&config, &mut graph).unwrap();
    assert!(!graph.is_used(&id("alpha", NodeKind::Method)));
}

#[test]
fn only_one_history_file_is_a_config_error() {
    let (_tree, mut config) = usage_tree(&[("2024-06-01", "42")]);
    config.usage_log_csv = None;
    let mut graph = decode_tree(&config);
    let before = graph.clone();

    let err = run_enrichment_phase(&config, &mut graph).unwrap_err();
    assert!(matches!(
        err,
        Error::IncompleteUsageHistory {
            modules: true,
            usage_log: false
        }
    ));
    assert_eq!(graph, before);
}

#[test]
fn unknown_logic_id_is_fatal() {
    let (_tree, config) = usage_tree(&[("2024-06-01", "7")]);
    let mut graph = decode_tree(&config);
    let err = run_enrichment_phase(&config, &mut graph).unwrap_err();
    assert!(err.to_string().contains('7'));
}

#[test]
fn missing_enrichment_file_is_io_error() {
    let tree = ExportTree::new();
    let config = AnalysisConfig {
        schema_json: Some(tree.root().join("nope.json")),
        ..tree.config()
    };
    let mut graph = decode_tree(&config);
    assert!(matches!(
        run_enrichment_phase(&config, &mut graph),
        Err(Error::Io { .. })
    ));
}

// ===========================================================================
// Index → table closure
// ===========================================================================

#[test]
fn closure_from_decoded_index_records() {
    let tree = ExportTree::new();
    tree.write("Methods/a.jc@.txt", "FIL,130,A.jcl\nIDX,04,ByCust\n");
    tree.write(
        "data/schema.json",
        r#"[{"name": "Cust", "indexes": [{"name": "ByCust"}]}]"#,
    );
    let config = AnalysisConfig {
        schema_json: Some(tree.root().join("data/schema.json")),
        ..tree.config()
    };
    let mut graph = decode_tree(&config);
    run_enrichment_phase(&config, &mut graph).unwrap();

    assert_eq!(
        ref_keys(&graph, &id("a", NodeKind::Method)),
        vec!["bycust_index", "cust_table"]
    );

    let snapshot = graph.clone();
    assert_eq!(link_index_tables(&mut graph), 0);
    assert_eq!(graph, snapshot);
}
