//! Result export and batch statistics for LEI resolution.

pub mod error;
pub mod export;
pub mod format;
pub mod stats;

pub use error::{ReportError, Result};
pub use export::{BASE_COLUMNS, result_header, result_row, write_csv, write_json, write_results};
pub use format::OutputFormat;
pub use stats::BatchStats;
