//! Session handle: a loaded reference table with its index.
//!
//! A [`Session`] can only be built from a finished table, so queries never
//! see a partially built index. Everything inside is read-only once built and
//! shared by reference across batch workers.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use lei_ingest::{LoadError, load_reference as load_table};
use lei_match::{CandidateIndex, IndexConfig, IndexStats, Normalizer, NormalizerConfig, Resolver};
use lei_model::{LoadMode, LoadOptions, LoadReport, MatchConfig, MatchResult, Query, ReferenceTable};

use crate::batch::{BatchControl, BatchReport, run_batch};
use crate::error::Result;

/// Everything needed to open a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub load: LoadOptions,
    pub normalizer: NormalizerConfig,
    pub index: IndexConfig,
}

/// Loads `path` in `mode` with default normalization and index settings.
pub fn load_reference(path: impl AsRef<Path>, mode: LoadMode) -> std::result::Result<Session, LoadError> {
    let (table, report) = load_table(path, LoadOptions::new(mode))?;
    Ok(Session::from_table(
        table,
        report,
        Normalizer::default(),
        IndexConfig::default(),
    ))
}

/// A loaded reference dataset ready to resolve queries.
#[derive(Debug)]
pub struct Session {
    table: ReferenceTable,
    index: CandidateIndex,
    normalizer: Normalizer,
    load_report: LoadReport,
}

impl Session {
    /// Loads the reference file and builds the index.
    pub fn open(path: impl AsRef<Path>, options: &SessionOptions) -> Result<Self> {
        let normalizer = Normalizer::new(&options.normalizer)?;
        let (table, report) = load_table(path, options.load)?;
        Ok(Self::from_table(table, report, normalizer, options.index))
    }

    /// Builds the index over an already loaded table.
    pub fn from_table(
        table: ReferenceTable,
        load_report: LoadReport,
        normalizer: Normalizer,
        index_config: IndexConfig,
    ) -> Self {
        let index = CandidateIndex::build_with(&table, &normalizer, index_config);
        Self {
            table,
            index,
            normalizer,
            load_report,
        }
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    pub fn index(&self) -> &CandidateIndex {
        &self.index
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub fn index_stats(&self) -> IndexStats {
        self.index.stats()
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.table, &self.index, &self.normalizer)
    }

    /// Resolves a single query on the calling thread.
    pub fn resolve(&self, query: &Query, config: &MatchConfig) -> Result<MatchResult> {
        config.validate()?;
        Ok(crate::batch::resolve_isolated(&self.resolver(), query, config))
    }

    /// Resolves plain names in parallel; `results[i]` answers `names[i]`.
    pub fn resolve_batch(&self, names: &[String], config: &MatchConfig) -> Result<BatchReport> {
        let queries: Vec<Query> = names.iter().map(|name| Query::new(name.as_str())).collect();
        self.resolve_queries(&queries, config, &BatchControl::default())
    }

    /// Resolves full queries with cancellation, progress and pool options.
    pub fn resolve_queries(
        &self,
        queries: &[Query],
        config: &MatchConfig,
        control: &BatchControl<'_>,
    ) -> Result<BatchReport> {
        config.validate()?;
        run_batch(&self.resolver(), queries, config, control)
    }

    /// Ends the session and frees the table and index.
    pub fn release(self) {
        let span = info_span!("release_session", records = self.table.len());
        let _guard = span.enter();
        let start = Instant::now();
        drop(self);
        info!(duration_ms = start.elapsed().as_millis(), "session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lei_model::{RecordStore, ReferenceField, SlimRecord};

    fn session() -> Session {
        let rows = vec![
            SlimRecord {
                lei: "529900T8BM49AURSDO55".into(),
                legal_name: "Acme Corporation Ltd".into(),
            },
            SlimRecord {
                lei: "5493001KJTIIGC8Y1R12".into(),
                legal_name: "Zenith Bakery GmbH".into(),
            },
        ];
        let fields = [ReferenceField::Lei, ReferenceField::LegalName]
            .into_iter()
            .collect();
        Session::from_table(
            ReferenceTable::new(RecordStore::Slim(rows), fields),
            LoadReport::default(),
            Normalizer::default(),
            IndexConfig::default(),
        )
    }

    #[test]
    fn test_resolve_single_query() {
        let session = session();
        let result = session
            .resolve(&Query::new("Zenith Bakery"), &MatchConfig::default())
            .unwrap();
        assert_eq!(result.lei.as_deref(), Some("5493001KJTIIGC8Y1R12"));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_dispatch() {
        let session = session();
        let config = MatchConfig::default().with_thresholds(0.5, 0.9);
        assert!(session.resolve_batch(&["Acme".to_string()], &config).is_err());
    }

    #[test]
    fn test_index_stats_cover_every_record() {
        let session = session();
        assert_eq!(session.index_stats().records, 2);
        session.release();
    }
}
