//! Threshold policy and deterministic ranking for one query.

use std::cmp::Ordering;

use rapidfuzz::distance::levenshtein;
use tracing::debug;

use lei_model::{
    Alternative, Classification, MatchConfig, MatchMethod, MatchResult, MatchedEntity, Query,
    RecordId, RecordRef, ReferenceField, ReferenceTable,
};

use crate::country::country_to_iso;
use crate::index::CandidateIndex;
use crate::normalize::{NormalizedKey, Normalizer};
use crate::score::score;

/// A candidate after scoring, with the fields used for tie-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub id: RecordId,
    pub score: f64,
    pub active: bool,
    /// Edit distance between the best-scoring normalized name and the raw query.
    pub distance: usize,
    pub lei: String,
}

/// Score descending, active entities first, smaller edit distance to the raw
/// query, then the lexicographically smaller LEI.
pub fn compare_scored(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.active.cmp(&a.active))
        .then_with(|| a.distance.cmp(&b.distance))
        .then_with(|| a.lei.cmp(&b.lei))
}

/// Maps a top score to a classification.
pub fn classify(top: Option<f64>, config: &MatchConfig) -> Classification {
    match top {
        Some(score) if score >= config.auto_threshold => Classification::AutoMatched,
        Some(score) if score >= config.review_threshold => Classification::NeedsReview,
        _ => Classification::NoMatch,
    }
}

/// Resolves queries against one loaded table and its index.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    table: &'a ReferenceTable,
    index: &'a CandidateIndex,
    normalizer: &'a Normalizer,
}

impl<'a> Resolver<'a> {
    pub fn new(
        table: &'a ReferenceTable,
        index: &'a CandidateIndex,
        normalizer: &'a Normalizer,
    ) -> Self {
        Self {
            table,
            index,
            normalizer,
        }
    }

    /// Resolves one query.
    ///
    /// A registry id that hits the registry index wins outright with a score
    /// of `1.0`; otherwise the name is matched through the candidate index.
    pub fn resolve(&self, query: &Query, config: &MatchConfig) -> MatchResult {
        self.resolve_registry_id(query, config)
            .unwrap_or_else(|| self.resolve_name(query, config))
            .with_query(query)
    }

    fn resolve_name(&self, query: &Query, config: &MatchConfig) -> MatchResult {

        let key = self.normalizer.normalize(&query.name);
        if key.is_empty() {
            return MatchResult::no_match(&query.name);
        }

        let (jurisdiction, diagnostic) = self.jurisdiction_filter(query);
        let candidates = match jurisdiction.as_deref() {
            Some(code) => self
                .index
                .lookup_filtered(&key, config.max_candidates, |id| {
                    self.table
                        .get(id)
                        .and_then(|record| record.jurisdiction())
                        .is_some_and(|value| value.eq_ignore_ascii_case(code))
                }),
            None => self.index.lookup(&key, config.max_candidates),
        };

        let scored = self.rank(&key, &query.name, candidates.iter().map(|c| c.id));
        debug!(
            candidates = candidates.len(),
            top = scored.first().map(|c| c.score),
            "name lookup scored"
        );
        let mut result = self.build_result(&query.name, &scored, config, MatchMethod::Name);
        if result.diagnostic.is_none() {
            result.diagnostic = diagnostic;
        }
        result
    }

    /// Scores and orders `ids` against `key`.
    pub fn rank(
        &self,
        key: &NormalizedKey,
        raw_query: &str,
        ids: impl Iterator<Item = RecordId>,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = ids
            .filter_map(|id| {
                let record = self.table.get(id)?;
                let (best, text) = self
                    .index
                    .keys(id)
                    .iter()
                    .map(|name| (score(key, name), name.text.as_str()))
                    .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| b.1.cmp(a.1)))?;
                Some(scored_candidate(id, record, best, text, raw_query))
            })
            .collect();
        scored.sort_by(compare_scored);
        scored
    }

    fn resolve_registry_id(&self, query: &Query, config: &MatchConfig) -> Option<MatchResult> {
        let registry_id = query.registry_id.as_deref()?;
        if !self.table.has_field(ReferenceField::RegistryEntityId) {
            return None;
        }
        let hits = self.index.lookup_registry_id(registry_id);
        if hits.is_empty() {
            return None;
        }
        let mut scored: Vec<ScoredCandidate> = hits
            .into_iter()
            .filter_map(|id| {
                let record = self.table.get(id)?;
                let text = self
                    .index
                    .keys(id)
                    .first()
                    .map_or("", |key| key.text.as_str());
                Some(scored_candidate(id, record, 1.0, text, &query.name))
            })
            .collect();
        scored.sort_by(compare_scored);
        debug!(hits = scored.len(), "registry id matched");
        Some(self.build_result(&query.name, &scored, config, MatchMethod::RegistryId))
    }

    /// Jurisdiction code to filter on, and a diagnostic when the query's
    /// country could not be used.
    fn jurisdiction_filter(&self, query: &Query) -> (Option<String>, Option<String>) {
        let Some(country) = query.country.as_deref().filter(|c| !c.trim().is_empty()) else {
            return (None, None);
        };
        if !self.table.has_field(ReferenceField::Jurisdiction) {
            return (
                None,
                Some(format!(
                    "country '{country}' ignored; the reference was loaded without jurisdictions"
                )),
            );
        }
        match country_to_iso(country) {
            Some(code) => (Some(code), None),
            None => (
                None,
                Some(format!(
                    "country '{country}' not recognized; searched all jurisdictions"
                )),
            ),
        }
    }

    fn build_result(
        &self,
        input: &str,
        scored: &[ScoredCandidate],
        config: &MatchConfig,
        method: MatchMethod,
    ) -> MatchResult {
        let classification = classify(scored.first().map(|c| c.score), config);
        let skip = usize::from(classification.has_match());
        let alternatives = scored
            .iter()
            .skip(skip)
            .take(config.max_alternatives)
            .map(|candidate| Alternative {
                lei: candidate.lei.clone(),
                legal_name: self.legal_name(candidate.id),
                score: candidate.score,
            })
            .collect();

        let best = scored.first().filter(|_| classification.has_match());
        MatchResult {
            input: input.to_string(),
            input_registry_id: None,
            input_country: None,
            lei: best.map(|c| c.lei.clone()),
            legal_name: best.map(|c| self.legal_name(c.id)),
            entity: best
                .and_then(|c| self.table.get(c.id))
                .and_then(MatchedEntity::from_record),
            confidence: scored.first().map_or(0.0, |c| c.score),
            classification,
            method: best.map(|_| method),
            alternatives,
            diagnostic: None,
        }
    }

    fn legal_name(&self, id: RecordId) -> String {
        self.table
            .get(id)
            .map(|record| record.legal_name().to_string())
            .unwrap_or_default()
    }
}

fn scored_candidate(
    id: RecordId,
    record: RecordRef<'_>,
    score: f64,
    normalized_name: &str,
    raw_query: &str,
) -> ScoredCandidate {
    ScoredCandidate {
        id,
        score,
        active: record.is_active(),
        distance: levenshtein::distance(normalized_name.chars(), raw_query.chars()),
        lei: record.lei().to_string(),
    }
}
