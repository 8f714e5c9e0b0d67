//! Batch statistics.

use serde::{Deserialize, Serialize};

use lei_model::{Classification, MatchMethod, MatchResult};

/// Counts per classification over one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub auto_matched: usize,
    pub needs_review: usize,
    pub no_match: usize,
    pub errors: usize,
    pub cancelled: usize,
    /// Matches found through the registry identifier.
    pub by_registry_id: usize,
}

impl BatchStats {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.classification {
                Classification::AutoMatched => stats.auto_matched += 1,
                Classification::NeedsReview => stats.needs_review += 1,
                Classification::NoMatch => stats.no_match += 1,
                Classification::Error => stats.errors += 1,
                Classification::Cancelled => stats.cancelled += 1,
            }
            if result.method == Some(MatchMethod::RegistryId) {
                stats.by_registry_id += 1;
            }
        }
        stats
    }

    pub fn count(&self, classification: Classification) -> usize {
        match classification {
            Classification::AutoMatched => self.auto_matched,
            Classification::NeedsReview => self.needs_review,
            Classification::NoMatch => self.no_match,
            Classification::Error => self.errors,
            Classification::Cancelled => self.cancelled,
        }
    }

    /// Share of queries with a reported LEI, in `[0, 1]`.
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.auto_matched + self.needs_review) as f64 / self.total as f64
    }
}
