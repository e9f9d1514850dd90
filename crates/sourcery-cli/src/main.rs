//! Sourcery CLI: call/reference graphs from legacy source exports.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use sourcery_core::config::{AnalysisConfig, NodeKind};
use sourcery_core::graph::{missing_method_calls, orphans};
use sourcery_core::output::{render, OutputFormat};
use sourcery_core::pipeline::{self, AnalysisResult};

#[derive(Parser)]
#[command(
    name = "sourcery",
    about = "Sourcery - Map calls and references across a legacy source export"
)]
struct Cli {
    /// Log debug detail to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors and results
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the export lives and what to enrich it with.
#[derive(Args)]
struct SourceArgs {
    /// Root of the export tree (holds Methods/, Forms/, ...)
    source_root: PathBuf,

    /// JSON config file; flags given here override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Module directory CSV (name in column 0, logic id in column 6)
    #[arg(long)]
    modules_csv: Option<PathBuf>,

    /// Usage log CSV (date in column 0, logic id in column 13)
    #[arg(long)]
    usage_csv: Option<PathBuf>,

    /// Count usage on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// JSON document listing externally triggered procedures
    #[arg(long)]
    system_procedures: Option<PathBuf>,

    /// JSON schema dump of tables, fields and indexes
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the full reference graph
    Graph {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format: dot or cypher
        #[arg(short, long, default_value = "dot", value_parser = parse_format)]
        format: OutputFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the units of one kind (method, form, report, public-procedure, ...)
    List {
        #[command(flatten)]
        source: SourceArgs,

        /// Node kind to list
        #[arg(value_parser = parse_kind)]
        kind: NodeKind,
    },
    /// Report method calls whose target does not exist
    MissingMethods {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Report code units nothing references and nothing uses
    Orphans {
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str_value(s)
        .ok_or_else(|| format!("unknown format '{s}' (expected dot or cypher)"))
}

fn parse_kind(s: &str) -> Result<NodeKind, String> {
    NodeKind::from_str_value(s).ok_or_else(|| format!("unknown kind '{s}'"))
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{} {msg}", style("error:").red().bold());
    std::process::exit(1);
}

/// Default log filter for a merged config; `RUST_LOG` still wins.
fn log_level(config: &AnalysisConfig) -> &'static str {
    if config.verbose {
        "debug"
    } else if config.quiet {
        "error"
    } else {
        "warn"
    }
}

fn init_logging(config: &AnalysisConfig) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level(config)))
        .format_timestamp(None)
        .init();
}

fn build_config(args: SourceArgs, verbose: bool, quiet: bool) -> AnalysisConfig {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path).unwrap_or_else(|e| fail(e)),
        None => AnalysisConfig::default(),
    };

    config.source_root = args.source_root.canonicalize().unwrap_or(args.source_root);
    if args.modules_csv.is_some() {
        config.modules_csv = args.modules_csv;
    }
    if args.usage_csv.is_some() {
        config.usage_log_csv = args.usage_csv;
    }
    if let Some(since) = args.since {
        config.usage_since = since;
    }
    if args.system_procedures.is_some() {
        config.system_procedures_json = args.system_procedures;
    }
    if args.schema.is_some() {
        config.schema_json = args.schema;
    }
    config.verbose |= verbose;
    config.quiet |= quiet;
    config
}

fn run_quiet(config: &AnalysisConfig) -> AnalysisResult {
    pipeline::run_pipeline(config, None).unwrap_or_else(|e| fail(e))
}

fn run_with_progress(config: &AnalysisConfig) -> AnalysisResult {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message("Initialising...");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let result = pipeline::run_pipeline(config, Some(progress));
    pb.finish_and_clear();
    result.unwrap_or_else(|e| fail(e))
}

fn analyse(config: &AnalysisConfig) -> AnalysisResult {
    if config.quiet {
        run_quiet(config)
    } else {
        run_with_progress(config)
    }
}

fn print_summary(config: &AnalysisConfig, result: &AnalysisResult, start: Instant) {
    if config.quiet {
        return;
    }
    let root_name = Path::new(&config.source_root)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    eprintln!(
        "\n{}  Sourcery Analysis: {}",
        style("✓").green().bold(),
        style(root_name).bold()
    );
    eprintln!("  {:<14} {}", "Files:", result.stats.files_decoded);
    eprintln!("  {:<14} {}", "Nodes:", result.stats.nodes);
    eprintln!("  {:<14} {}", "References:", result.stats.references);
    eprintln!("  {:<14} {}", "Used:", result.stats.used);
    eprintln!("  {:<14} {}", "Missing:", result.stats.missing);
    eprintln!(
        "  {:<14} {:.1}ms",
        "Duration:",
        start.elapsed().as_secs_f64() * 1000.0
    );

    if config.verbose {
        eprintln!("\n  Phase Timings:");
        for (phase, secs) in &result.timings {
            eprintln!("    {:<14} {:.1}ms", phase, secs * 1000.0);
        }
    }
}

/// Write `bytes` to `output` or stdout.
fn emit(bytes: &[u8], output: Option<&Path>) {
    let written = match output {
        Some(path) => std::fs::write(path, bytes),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).and_then(|_| stdout.flush())
        }
    };
    if let Err(e) = written {
        fail(format!("failed to write output: {e}"));
    }
}

fn lines_to_bytes<I: IntoIterator<Item = String>>(lines: I) -> Vec<u8> {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out.into_bytes()
}

fn main() {
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Graph {
            source,
            format,
            output,
        } => {
            let config = build_config(source, cli.verbose, cli.quiet);
            init_logging(&config);
            let result = analyse(&config);

            let mut rendered = Vec::new();
            if let Err(e) = render(&result.graph, format, &mut rendered) {
                fail(format!("failed to render graph: {e}"));
            }
            emit(&rendered, output.as_deref());

            print_summary(&config, &result, start);
            if let Some(path) = output {
                if !config.quiet {
                    eprintln!(
                        "\n  {} {}",
                        style("Output written to:").green(),
                        path.display()
                    );
                }
            }
        }
        Commands::List { source, kind } => {
            let config = build_config(source, cli.verbose, cli.quiet);
            init_logging(&config);
            let result = analyse(&config);
            let labels = result
                .graph
                .nodes_of_kind(kind)
                .into_iter()
                .map(|n| n.label.clone());
            emit(&lines_to_bytes(labels), None);
        }
        Commands::MissingMethods { source } => {
            let config = build_config(source, cli.verbose, cli.quiet);
            init_logging(&config);
            let result = analyse(&config);
            let lines = missing_method_calls(&result.graph)
                .into_iter()
                .map(|m| m.to_string());
            emit(&lines_to_bytes(lines), None);
        }
        Commands::Orphans { source } => {
            let config = build_config(source, cli.verbose, cli.quiet);
            init_logging(&config);
            let result = analyse(&config);
            let lines = orphans(&result.graph)
                .into_iter()
                .map(|n| format!("{} ({})", n.label, n.id.kind));
            emit(&lines_to_bytes(lines), None);
        }
    }
}
