use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, info_span, trace};

use lei_cli::config::{AppConfig, Overrides, settings_path};
use lei_cli::logging::redact_value;
use lei_core::{BatchControl, Session};
use lei_ingest::read_queries;
use lei_match::IndexStats;
use lei_model::{LoadMode, LoadReport};
use lei_report::{BatchStats, OutputFormat, write_results};

use crate::cli::{InspectArgs, MatchArgs, SourceArgs};

/// Outcome of `lei-resolver match`.
#[derive(Debug)]
pub struct MatchOutcome {
    pub output: PathBuf,
    pub format: OutputFormat,
    pub stats: BatchStats,
    pub cancelled: bool,
    pub load_report: LoadReport,
    pub elapsed: Duration,
}

/// Outcome of `lei-resolver inspect`.
#[derive(Debug)]
pub struct InspectOutcome {
    pub reference: PathBuf,
    pub mode: LoadMode,
    pub active_only: bool,
    pub load_report: LoadReport,
    pub index: IndexStats,
    pub elapsed: Duration,
}

pub fn run_match(args: &MatchArgs) -> Result<MatchOutcome> {
    let span = info_span!("match", input = %args.input.display());
    let _guard = span.enter();
    let start = Instant::now();

    let config = resolve_config(&args.source, &args.overrides())?;
    let queries = read_queries(&args.input, &config.columns)
        .with_context(|| format!("read input {}", args.input.display()))?;
    let session = open_session(&args.source.reference, &config)?;

    let bar = progress_bar(queries.len(), args.no_progress)?;
    let observer = |processed: usize, _total: usize| bar.set_position(processed as u64);
    let mut control = BatchControl::default().with_observer(&observer);
    if let Some(threads) = config.threads {
        control = control.with_threads(threads);
    }
    let report = session
        .resolve_queries(&queries, &config.matching, &control)
        .context("resolve batch")?;
    bar.finish_and_clear();

    for result in &report.results {
        trace!(
            input = redact_value(&result.input),
            classification = %result.classification,
            lei = result.lei.as_deref().unwrap_or("-"),
            confidence = result.confidence,
            "resolved"
        );
    }

    let format = config.output_format(args.output.as_deref());
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, format));
    write_results(
        &output,
        &report.results,
        format,
        config.matching.max_alternatives,
    )
    .with_context(|| format!("write results to {}", output.display()))?;

    let stats = BatchStats::from_results(&report.results);
    let load_report = session.load_report().clone();
    session.release();
    info!(
        queries = stats.total,
        duration_ms = start.elapsed().as_millis(),
        "match complete"
    );
    Ok(MatchOutcome {
        output,
        format,
        stats,
        cancelled: report.cancelled,
        load_report,
        elapsed: start.elapsed(),
    })
}

pub fn run_inspect(args: &InspectArgs) -> Result<InspectOutcome> {
    let span = info_span!("inspect", reference = %args.source.reference.display());
    let _guard = span.enter();
    let start = Instant::now();

    let config = resolve_config(&args.source, &args.source.overrides())?;
    let session = open_session(&args.source.reference, &config)?;
    let outcome = InspectOutcome {
        reference: args.source.reference.clone(),
        mode: config.mode,
        active_only: config.active_only,
        load_report: session.load_report().clone(),
        index: session.index_stats(),
        elapsed: start.elapsed(),
    };
    session.release();
    Ok(outcome)
}

fn resolve_config(source: &SourceArgs, overrides: &Overrides) -> Result<AppConfig> {
    let user = if source.no_user_config {
        None
    } else {
        settings_path()
    };
    let mut config = AppConfig::from_files(source.config.as_deref(), user.as_deref())?;
    config.apply(overrides);
    config.validate().context("invalid configuration")?;
    debug!(
        mode = %config.mode,
        active_only = config.active_only,
        auto_threshold = config.matching.auto_threshold,
        review_threshold = config.matching.review_threshold,
        max_candidates = config.matching.max_candidates,
        "configuration resolved"
    );
    Ok(config)
}

fn open_session(reference: &Path, config: &AppConfig) -> Result<Session> {
    Session::open(reference, &config.session_options())
        .with_context(|| format!("load reference {}", reference.display()))
}

fn progress_bar(len: usize, hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})",
        )?
        .progress_chars("=> "),
    );
    bar.set_message("Resolving");
    Ok(bar)
}

/// `<dir>/<stem>_lei_results.<ext>` next to the input file.
fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("batch");
    input.with_file_name(format!("{stem}_lei_results.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("data/clients.csv"), OutputFormat::Json),
            PathBuf::from("data/clients_lei_results.json")
        );
        assert_eq!(
            default_output_path(Path::new("names.txt"), OutputFormat::Csv),
            PathBuf::from("names_lei_results.csv")
        );
    }
}
