//! Outcome counters of a reference load.

use serde::{Deserialize, Serialize};

/// A LEI that appeared on more than one row.
///
/// The later row replaces the earlier one in the table; the earlier row is
/// recorded here as dropped. Line numbers are 1-based and count the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub lei: String,
    pub kept_line: u64,
    pub dropped_line: u64,
}

/// Summary of one pass over the reference file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Data rows read, excluding the header.
    pub rows_read: u64,
    /// Records retained in the table.
    pub records: usize,
    pub duplicates: Vec<DuplicateKey>,
    /// Rows skipped because the LEI cell was empty.
    pub skipped_empty_lei: u64,
    /// Rows removed by the active-only filter.
    pub filtered_inactive: u64,
    /// Rows where at least one cell was not valid UTF-8.
    pub lossy_rows: u64,
}

impl LoadReport {
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    /// Rows read that did not become a distinct record.
    pub fn discarded_rows(&self) -> u64 {
        self.rows_read.saturating_sub(self.records as u64)
    }
}
