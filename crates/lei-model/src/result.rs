//! Queries and per-query match results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::RecordRef;

/// One entry of a user batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Entity name as supplied by the user.
    pub name: String,
    /// Registration-authority identifier (RCS, SIREN, company number).
    pub registry_id: Option<String>,
    /// Country name or ISO code used to restrict candidates.
    pub country: Option<String>,
}

impl Query {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_registry_id(mut self, registry_id: impl Into<String>) -> Self {
        self.registry_id = Some(registry_id.into());
        self
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

impl From<&str> for Query {
    fn from(name: &str) -> Self {
        Query::new(name)
    }
}

impl From<String> for Query {
    fn from(name: String) -> Self {
        Query::new(name)
    }
}

/// Outcome category of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Best score at or above the auto threshold.
    AutoMatched,
    /// Best score between the review and auto thresholds.
    NeedsReview,
    /// No candidate reached the review threshold.
    NoMatch,
    /// The query could not be processed.
    Error,
    /// The batch was cancelled before the query was started.
    Cancelled,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::AutoMatched,
        Classification::NeedsReview,
        Classification::NoMatch,
        Classification::Error,
        Classification::Cancelled,
    ];

    /// Short tag written to result files.
    pub fn tag(&self) -> &'static str {
        match self {
            Classification::AutoMatched => "Auto",
            Classification::NeedsReview => "Review",
            Classification::NoMatch => "None",
            Classification::Error => "Error",
            Classification::Cancelled => "Cancelled",
        }
    }

    /// Returns true if a LEI is reported for this outcome.
    pub fn has_match(&self) -> bool {
        matches!(
            self,
            Classification::AutoMatched | Classification::NeedsReview
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// How the best candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMethod {
    /// Fuzzy comparison of normalized names.
    Name,
    /// Exact hit on the registration-authority identifier.
    RegistryId,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Name => "name",
            MatchMethod::RegistryId => "registry_id",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A runner-up candidate kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub lei: String,
    pub legal_name: String,
    pub score: f64,
}

/// Reference attributes of the matched entity, available in full mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedEntity {
    pub jurisdiction: Option<String>,
    pub entity_status: Option<String>,
    pub registration_status: Option<String>,
    pub registration_authority: Option<String>,
    pub registry_id: Option<String>,
}

impl MatchedEntity {
    /// Attributes of `record`, or `None` for a slim record.
    pub fn from_record(record: RecordRef<'_>) -> Option<Self> {
        let RecordRef::Full(_) = record else {
            return None;
        };
        let owned = |value: Option<&str>| value.map(str::to_string);
        Some(Self {
            jurisdiction: owned(record.jurisdiction()),
            entity_status: owned(record.entity_status()),
            registration_status: owned(record.registration_status()),
            registration_authority: owned(record.registration_authority()),
            registry_id: owned(record.registry_entity_id()),
        })
    }
}

/// Resolution outcome of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The query name exactly as supplied.
    pub input: String,
    /// Registry id supplied with the query.
    #[serde(default)]
    pub input_registry_id: Option<String>,
    /// Country supplied with the query.
    #[serde(default)]
    pub input_country: Option<String>,
    pub lei: Option<String>,
    pub legal_name: Option<String>,
    #[serde(default)]
    pub entity: Option<MatchedEntity>,
    /// Score of the best candidate, `0.0` when there was none.
    pub confidence: f64,
    pub classification: Classification,
    pub method: Option<MatchMethod>,
    pub alternatives: Vec<Alternative>,
    pub diagnostic: Option<String>,
}

impl MatchResult {
    /// A result with no candidate at all.
    pub fn no_match(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            input_registry_id: None,
            input_country: None,
            lei: None,
            legal_name: None,
            entity: None,
            confidence: 0.0,
            classification: Classification::NoMatch,
            method: None,
            alternatives: Vec::new(),
            diagnostic: None,
        }
    }

    /// A failed query with a diagnostic message.
    pub fn error(input: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            classification: Classification::Error,
            diagnostic: Some(diagnostic.into()),
            ..Self::no_match(input)
        }
    }

    /// Copies the query's registry id and country onto the result.
    #[must_use]
    pub fn with_query(mut self, query: &Query) -> Self {
        self.input_registry_id = query.registry_id.clone();
        self.input_country = query.country.clone();
        self
    }

    /// A query that was never started.
    pub fn cancelled(input: impl Into<String>) -> Self {
        Self {
            classification: Classification::Cancelled,
            diagnostic: Some("batch cancelled before this query started".to_string()),
            ..Self::no_match(input)
        }
    }
}
