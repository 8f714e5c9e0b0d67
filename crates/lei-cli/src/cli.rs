//! CLI argument definitions for the LEI resolver.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use lei_cli::config::Overrides;
use lei_model::LoadMode;
use lei_report::OutputFormat;

#[derive(Parser)]
#[command(
    name = "lei-resolver",
    version,
    about = "Resolve legal-entity names to Legal Entity Identifiers",
    long_about = "Resolve free-form legal-entity names to LEI records from a GLEIF \
                  golden-copy CSV.\n\n\
                  Each input is classified as Auto (accepted), Review (needs a human) \
                  or None, with ranked alternatives for audit."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow query names to appear in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a batch of entity names against the reference file.
    Match(MatchArgs),

    /// Load the reference file and report row counts and index statistics.
    Inspect(InspectArgs),
}

/// Reference file and configuration sources shared by every command.
#[derive(Args)]
pub struct SourceArgs {
    /// GLEIF golden-copy CSV.
    #[arg(long = "reference", short = 'r', value_name = "FILE")]
    pub reference: PathBuf,

    /// Team configuration file (TOML).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ignore the user settings file.
    #[arg(long = "no-user-config")]
    pub no_user_config: bool,

    /// Columns to load (slim keeps only LEI and legal name).
    #[arg(long = "mode", value_enum)]
    pub mode: Option<ModeArg>,

    /// Keep only ACTIVE entities with an ISSUED registration.
    #[arg(long = "active-only", conflicts_with = "all_statuses")]
    pub active_only: bool,

    /// Keep entities of every status.
    #[arg(long = "all-statuses")]
    pub all_statuses: bool,
}

impl SourceArgs {
    pub fn overrides(&self) -> Overrides {
        let active_only = if self.all_statuses {
            Some(false)
        } else if self.active_only {
            Some(true)
        } else {
            None
        };
        Overrides {
            mode: self.mode.map(LoadMode::from),
            active_only,
            ..Overrides::default()
        }
    }
}

#[derive(Args)]
pub struct MatchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Batch of names: CSV with a header row, or .txt with one name per line.
    #[arg(long = "input", short = 'i', value_name = "FILE")]
    pub input: PathBuf,

    /// Result file (default: <INPUT>_lei_results.<format>).
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Result format (default: from the output extension, else csv).
    #[arg(long = "format", value_enum)]
    pub format: Option<FormatArg>,

    /// Input column holding the entity name.
    #[arg(long = "name-column", value_name = "COLUMN")]
    pub name_column: Option<String>,

    /// Input column holding a registry identifier (RCS, SIREN, company number).
    #[arg(long = "registry-column", value_name = "COLUMN")]
    pub registry_column: Option<String>,

    /// Input column holding a country name or ISO code.
    #[arg(long = "country-column", value_name = "COLUMN")]
    pub country_column: Option<String>,

    /// Minimum score for an automatic match.
    #[arg(long = "auto-threshold", value_name = "SCORE")]
    pub auto_threshold: Option<f64>,

    /// Minimum score for a review match.
    #[arg(long = "review-threshold", value_name = "SCORE")]
    pub review_threshold: Option<f64>,

    /// Candidates scored per query.
    #[arg(long = "max-candidates", value_name = "N")]
    pub max_candidates: Option<usize>,

    /// Alternatives reported per query.
    #[arg(long = "max-alternatives", value_name = "N")]
    pub max_alternatives: Option<usize>,

    /// Worker threads (default: all cores).
    #[arg(long = "threads", short = 'j', value_name = "N")]
    pub threads: Option<usize>,

    /// Hide the progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

impl MatchArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            auto_threshold: self.auto_threshold,
            review_threshold: self.review_threshold,
            max_candidates: self.max_candidates,
            max_alternatives: self.max_alternatives,
            name_column: self.name_column.clone(),
            registry_column: self.registry_column.clone(),
            country_column: self.country_column.clone(),
            format: self.format.map(OutputFormat::from),
            threads: self.threads,
            ..self.source.overrides()
        }
    }
}

#[derive(Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Full,
    Slim,
}

impl From<ModeArg> for LoadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Full => LoadMode::Full,
            ModeArg::Slim => LoadMode::Slim,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
