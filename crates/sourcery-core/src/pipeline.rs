//! Sequential phase orchestrator with timing.

use std::time::Instant;

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::graph::CallGraph;
use crate::phases;
use crate::phases::discovery::SourceFile;
use crate::phases::enrichment::EnrichmentStats;
use crate::statement::{LogosTokenizer, MethodCallExtractor, Tokenizer};

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("discovery", "Finding export files"),
    ("decoding", "Decoding export records"),
    ("enrichment", "Applying usage and schema data"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

/// State threaded through the phases.
#[derive(Default)]
struct PipelineState {
    files: Vec<SourceFile>,
    files_decoded: usize,
    enrichment: EnrichmentStats,
    graph: CallGraph,
}

type PhaseFn<'a> = Box<dyn FnOnce(&AnalysisConfig, &mut PipelineState) -> Result<()> + 'a>;

/// Summary numbers for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    pub files_decoded: usize,
    pub nodes: usize,
    pub references: usize,
    pub used: usize,
    pub missing: usize,
    pub index_table_links: usize,
}

/// The finished graph plus what it took to build it.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub graph: CallGraph,
    pub stats: AnalysisStats,
    /// Seconds per phase, in run order.
    pub timings: Vec<(String, f64)>,
    pub total_ms: f64,
}

/// Run discovery, decoding and enrichment with the built-in tokenizer.
pub fn run_pipeline(
    config: &AnalysisConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult> {
    run_pipeline_with(config, &MethodCallExtractor::new(LogosTokenizer), progress_callback)
}

/// Run the pipeline with a caller-supplied statement extractor.
///
/// The configuration is validated before any file is read, and the first
/// error from any phase ends the run without a result.
pub fn run_pipeline_with<T: Tokenizer>(
    config: &AnalysisConfig,
    extractor: &MethodCallExtractor<T>,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult> {
    config.validate()?;

    let mut state = PipelineState::default();
    let mut timings = Vec::new();
    let total_start = Instant::now();

    let phase_fns: Vec<(&str, PhaseFn<'_>)> = vec![
        (
            "discovery",
            Box::new(|config, state| {
                state.files = phases::discovery::run_discovery_phase(config)?;
                Ok(())
            }),
        ),
        (
            "decoding",
            Box::new(|_config, state| {
                state.files_decoded = phases::decoding::run_decoding_phase(
                    &state.files,
                    extractor,
                    &mut state.graph,
                )?;
                Ok(())
            }),
        ),
        (
            "enrichment",
            Box::new(|config, state| {
                state.enrichment =
                    phases::enrichment::run_enrichment_phase(config, &mut state.graph)?;
                Ok(())
            }),
        ),
    ];

    for (name, phase_fn) in phase_fns {
        if let Some(ref mut cb) = progress_callback {
            let label = PHASE_LABELS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, l)| *l)
                .unwrap_or(name);
            cb(name, label);
        }

        let start = Instant::now();
        phase_fn(config, &mut state)?;
        let elapsed = start.elapsed().as_secs_f64();
        log::debug!("phase {name} took {:.1}ms", elapsed * 1000.0);
        timings.push((name.to_string(), elapsed));
    }

    let graph = state.graph;
    let stats = AnalysisStats {
        files_decoded: state.files_decoded,
        nodes: graph.node_count(),
        references: graph.reference_count(),
        used: graph.used_count(),
        missing: graph.missing_refs().len(),
        index_table_links: state.enrichment.index_table_links,
    };

    Ok(AnalysisResult {
        graph,
        stats,
        timings,
        total_ms: total_start.elapsed().as_secs_f64() * 1000.0,
    })
}
