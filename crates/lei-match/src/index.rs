//! Token inverted index over normalized reference names.
//!
//! Only records that share at least one blocking token with a query are ever
//! considered. Names with no common token (heavy abbreviation, transliteration
//! differences) are outside the recall boundary of this index.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use lei_model::{RecordId, ReferenceField, ReferenceTable};

use crate::normalize::{NormalizedKey, Normalizer, normalize_registry_id};

/// Tuning knobs for candidate lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Posting lists longer than this only reinforce records already found
    /// through rarer tokens.
    pub frequent_token_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            frequent_token_limit: 20_000,
        }
    }
}

/// A record sharing tokens with a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: RecordId,
    /// Number of distinct query blocking tokens found in the record's names.
    pub overlap: u32,
    /// Sum of the inverse document frequencies of those tokens.
    pub weight: f64,
    /// One of the record's normalized names equals the query's.
    pub exact: bool,
}

/// Size figures of a built index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub records: usize,
    pub names: usize,
    pub distinct_tokens: usize,
    pub largest_posting: usize,
    pub registry_ids: usize,
}

/// Read-only lookup structure built once per session.
#[derive(Debug)]
pub struct CandidateIndex {
    config: IndexConfig,
    /// Normalized names per record, legal name first.
    keys: Vec<Vec<NormalizedKey>>,
    postings: HashMap<Box<str>, Vec<RecordId>>,
    /// Normalized name text to the records carrying it.
    exact: HashMap<Box<str>, Vec<RecordId>>,
    registry: HashMap<Box<str>, Vec<RecordId>>,
}

impl CandidateIndex {
    pub fn build(table: &ReferenceTable, normalizer: &Normalizer) -> Self {
        Self::build_with(table, normalizer, IndexConfig::default())
    }

    pub fn build_with(
        table: &ReferenceTable,
        normalizer: &Normalizer,
        config: IndexConfig,
    ) -> Self {
        let span = info_span!("build_index", records = table.len());
        let _guard = span.enter();
        let start = Instant::now();

        let keys: Vec<Vec<NormalizedKey>> = (0..table.len())
            .into_par_iter()
            .map(|index| {
                RecordId::from_index(index)
                    .and_then(|id| table.get(id))
                    .map(|record| {
                        record
                            .names()
                            .map(|name| normalizer.normalize(name))
                            .filter(|key| !key.is_empty())
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();

        let mut postings: HashMap<Box<str>, Vec<RecordId>> = HashMap::new();
        let mut exact: HashMap<Box<str>, Vec<RecordId>> = HashMap::new();
        for (index, names) in keys.iter().enumerate() {
            let Some(id) = RecordId::from_index(index) else {
                break;
            };
            for key in names {
                let ids = exact.entry(Box::from(key.text.as_str())).or_default();
                if ids.last() != Some(&id) {
                    ids.push(id);
                }
            }
            let mut seen: Vec<&str> = Vec::new();
            for token in names.iter().flat_map(|key| key.blocking_tokens.iter()) {
                if seen.contains(&token.as_str()) {
                    continue;
                }
                seen.push(token);
                postings
                    .entry(Box::from(token.as_str()))
                    .or_default()
                    .push(id);
            }
        }

        let mut registry: HashMap<Box<str>, Vec<RecordId>> = HashMap::new();
        if table.has_field(ReferenceField::RegistryEntityId) {
            for (id, record) in table.iter() {
                let Some(raw) = record.registry_entity_id() else {
                    continue;
                };
                let key = normalize_registry_id(raw);
                if !key.is_empty() {
                    registry.entry(key.into_boxed_str()).or_default().push(id);
                }
            }
        }

        let index = Self {
            config,
            keys,
            postings,
            exact,
            registry,
        };
        let stats = index.stats();
        info!(
            names = stats.names,
            tokens = stats.distinct_tokens,
            largest_posting = stats.largest_posting,
            registry_ids = stats.registry_ids,
            duration_ms = start.elapsed().as_millis(),
            "candidate index built"
        );
        index
    }

    pub fn config(&self) -> IndexConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Normalized names of a record, legal name first.
    pub fn keys(&self, id: RecordId) -> &[NormalizedKey] {
        self.keys.get(id.index()).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of records whose names contain `token`.
    pub fn document_frequency(&self, token: &str) -> usize {
        self.postings.get(token).map_or(0, Vec::len)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            records: self.keys.len(),
            names: self.keys.iter().map(Vec::len).sum(),
            distinct_tokens: self.postings.len(),
            largest_posting: self.postings.values().map(Vec::len).max().unwrap_or(0),
            registry_ids: self.registry.len(),
        }
    }

    /// Records whose normalized registration-authority id equals `registry_id`
    /// after normalization, in ascending id order.
    pub fn lookup_registry_id(&self, registry_id: &str) -> Vec<RecordId> {
        let key = normalize_registry_id(registry_id);
        if key.is_empty() {
            return Vec::new();
        }
        self.registry.get(key.as_str()).cloned().unwrap_or_default()
    }

    /// Up to `max_candidates` records sharing blocking tokens with `key`.
    pub fn lookup(&self, key: &NormalizedKey, max_candidates: usize) -> Vec<Candidate> {
        self.lookup_filtered(key, max_candidates, |_| true)
    }

    /// Records with a normalized name equal to `key`, in ascending id order.
    pub fn lookup_exact(&self, key: &NormalizedKey) -> &[RecordId] {
        self.exact
            .get(key.text.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Like [`lookup`](Self::lookup), keeping only records accepted by `filter`.
    ///
    /// Tokens are visited rarest first. A token whose posting list exceeds
    /// the frequent-token limit is only intersected with records already
    /// collected, unless nothing has been collected yet. Records whose
    /// normalized name equals the query rank ahead of every other candidate,
    /// so the cap never drops them.
    pub fn lookup_filtered<F>(
        &self,
        key: &NormalizedKey,
        max_candidates: usize,
        filter: F,
    ) -> Vec<Candidate>
    where
        F: Fn(RecordId) -> bool,
    {
        if key.is_empty() || max_candidates == 0 {
            return Vec::new();
        }

        let mut lists: Vec<(&str, &[RecordId])> = key
            .blocking_tokens
            .iter()
            .filter_map(|token| {
                self.postings
                    .get(token.as_str())
                    .map(|list| (token.as_str(), list.as_slice()))
            })
            .collect();
        lists.sort_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| a.0.cmp(b.0)));

        let total = self.keys.len().max(1) as f64;
        let mut found: HashMap<RecordId, (u32, f64)> = HashMap::new();
        for (token, list) in lists {
            let idf = (total / list.len() as f64).ln() + 1.0;
            if list.len() > self.config.frequent_token_limit && !found.is_empty() {
                debug!(token, postings = list.len(), "frequent token used for intersection only");
                for (id, (overlap, weight)) in found.iter_mut() {
                    if list.binary_search(id).is_ok() {
                        *overlap += 1;
                        *weight += idf;
                    }
                }
                continue;
            }
            for id in list {
                if let Some((overlap, weight)) = found.get_mut(id) {
                    *overlap += 1;
                    *weight += idf;
                } else if filter(*id) {
                    found.insert(*id, (1, idf));
                }
            }
        }

        let exact = self.lookup_exact(key);
        for id in exact {
            if !found.contains_key(id) && filter(*id) {
                found.insert(*id, (0, 0.0));
            }
        }

        let mut candidates: Vec<Candidate> = found
            .into_iter()
            .map(|(id, (overlap, weight))| Candidate {
                id,
                overlap,
                weight,
                exact: exact.binary_search(&id).is_ok(),
            })
            .collect();
        candidates.sort_by(compare_candidates);
        candidates.truncate(max_candidates);
        candidates
    }
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.exact
        .cmp(&a.exact)
        .then_with(|| b.overlap.cmp(&a.overlap))
        .then_with(|| b.weight.total_cmp(&a.weight))
        .then_with(|| a.id.cmp(&b.id))
}
