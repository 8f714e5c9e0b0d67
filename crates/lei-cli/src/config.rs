//! Layered application configuration.
//!
//! Layers, lowest precedence first:
//! 1. built-in defaults
//! 2. team configuration passed with `--config`
//! 3. user settings in the platform config directory
//! 4. command-line flags
//!
//! File layers are merged key by key, so a user file that only sets
//! `matching.auto_threshold` keeps every other team value. Arrays (such as
//! `normalizer.legal_forms`) are replaced as a whole.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lei_core::SessionOptions;
use lei_ingest::InputColumns;
use lei_match::{IndexConfig, NormalizerConfig};
use lei_model::{LoadMode, LoadOptions, MatchConfig};
use lei_report::OutputFormat;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "lei-resolver";
const APP_NAME: &str = "LEI Resolver";
const CONFIG_FILENAME: &str = "settings.toml";

/// Get the path to the user settings file.
///
/// Returns `None` if the platform-specific directory cannot be determined.
pub fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

/// Effective configuration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: LoadMode,
    /// Keep only `ACTIVE` entities with an `ISSUED` registration.
    pub active_only: bool,
    pub matching: MatchConfig,
    pub columns: InputColumns,
    /// Output format; guessed from the output extension when unset.
    pub format: Option<OutputFormat>,
    /// Worker threads; all cores when unset.
    pub threads: Option<usize>,
    pub normalizer: NormalizerConfig,
    pub index: IndexConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: LoadMode::Full,
            active_only: true,
            matching: MatchConfig::default(),
            columns: InputColumns::default(),
            format: None,
            threads: None,
            normalizer: NormalizerConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub mode: Option<LoadMode>,
    pub active_only: Option<bool>,
    pub auto_threshold: Option<f64>,
    pub review_threshold: Option<f64>,
    pub max_candidates: Option<usize>,
    pub max_alternatives: Option<usize>,
    pub name_column: Option<String>,
    pub registry_column: Option<String>,
    pub country_column: Option<String>,
    pub format: Option<OutputFormat>,
    pub threads: Option<usize>,
}

impl AppConfig {
    /// Merges the team and user files over the defaults.
    ///
    /// The team file must exist and parse. A missing user file is skipped
    /// and an unreadable one is logged and skipped.
    pub fn from_files(team: Option<&Path>, user: Option<&Path>) -> Result<Self> {
        let mut merged = toml::Table::new();
        if let Some(path) = team {
            let table = read_table(path)
                .with_context(|| format!("load configuration {}", path.display()))?;
            merge_tables(&mut merged, table);
            info!(path = %path.display(), "loaded team configuration");
        }
        if let Some(path) = user {
            if let Some(table) = read_user_table(path) {
                merge_tables(&mut merged, table);
                info!(path = %path.display(), "loaded user settings");
            }
        }
        toml::Value::Table(merged)
            .try_into()
            .context("invalid configuration values")
    }

    /// Applies command-line values on top of the file layers.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(active_only) = overrides.active_only {
            self.active_only = active_only;
        }
        if let Some(value) = overrides.auto_threshold {
            self.matching.auto_threshold = value;
        }
        if let Some(value) = overrides.review_threshold {
            self.matching.review_threshold = value;
        }
        if let Some(value) = overrides.max_candidates {
            self.matching.max_candidates = value;
        }
        if let Some(value) = overrides.max_alternatives {
            self.matching.max_alternatives = value;
        }
        if let Some(column) = &overrides.name_column {
            self.columns.name.clone_from(column);
        }
        if let Some(column) = &overrides.registry_column {
            self.columns.registry_id = Some(column.clone());
        }
        if let Some(column) = &overrides.country_column {
            self.columns.country = Some(column.clone());
        }
        if overrides.format.is_some() {
            self.format = overrides.format;
        }
        if overrides.threads.is_some() {
            self.threads = overrides.threads;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        if self.threads == Some(0) {
            bail!("threads must be at least 1");
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::new(self.mode).with_active_only(self.active_only)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            load: self.load_options(),
            normalizer: self.normalizer.clone(),
            index: self.index,
        }
    }

    /// Output format for `path`, falling back to CSV.
    pub fn output_format(&self, path: Option<&Path>) -> OutputFormat {
        self.format
            .or_else(|| path.and_then(OutputFormat::from_path))
            .unwrap_or_default()
    }
}

/// Merges `overlay` into `base`; nested tables merge, other values replace.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
            } else {
                base.insert(key, toml::Value::Table(incoming));
            }
        } else {
            base.insert(key, value);
        }
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path).context("read file")?;
    toml::from_str(&content).context("parse TOML")
}

fn read_user_table(path: &Path) -> Option<toml::Table> {
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse user settings, ignoring");
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read user settings, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_active_entities_only() {
        let config = AppConfig::default();
        assert!(config.active_only);
        assert_eq!(config.mode, LoadMode::Full);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_tables_is_key_by_key() {
        let mut base: toml::Table =
            toml::from_str("[matching]\nauto_threshold = 0.95\nreview_threshold = 0.85\n").unwrap();
        let overlay: toml::Table = toml::from_str("[matching]\nauto_threshold = 0.9\n").unwrap();
        merge_tables(&mut base, overlay);
        let matching = base["matching"].as_table().unwrap();
        assert_eq!(matching["auto_threshold"].as_float(), Some(0.9));
        assert_eq!(matching["review_threshold"].as_float(), Some(0.85));
    }

    #[test]
    fn test_output_format_falls_back_to_extension() {
        let mut config = AppConfig::default();
        assert_eq!(
            config.output_format(Some(Path::new("out.json"))),
            OutputFormat::Json
        );
        assert_eq!(config.output_format(None), OutputFormat::Csv);
        config.format = Some(OutputFormat::Csv);
        assert_eq!(
            config.output_format(Some(Path::new("out.json"))),
            OutputFormat::Csv
        );
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = AppConfig {
            threads: Some(0),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
