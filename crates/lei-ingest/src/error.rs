//! Error types for reference and batch ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the reference dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or read.
    #[error("failed to read reference file {path}: {source}")]
    DataIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Required columns are missing from the header.
    #[error(
        "reference file {path} is missing required columns [{}]; available columns: [{}]",
        .missing.join(", "),
        .available.join(", ")
    )]
    DataFormat {
        path: PathBuf,
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// The CSV structure could not be parsed.
    #[error("failed to parse reference file {path} near line {line}: {message}")]
    Malformed {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

/// Errors raised while reading a user batch.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read input file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "column '{column}' not found in {path}; available columns: [{}]",
        .available.join(", ")
    )]
    MissingColumn {
        column: String,
        path: PathBuf,
        available: Vec<String>,
    },

    #[error("failed to parse input file {path} near line {line}: {message}")]
    Malformed {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;
