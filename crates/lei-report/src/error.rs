//! Error types for result export.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while writing result tables.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown output format '{0}' (expected csv or json)")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;
