//! Entity-name matching: normalization, candidate blocking, scoring and
//! threshold policy.

pub mod country;
pub mod index;
pub mod normalize;
pub mod resolve;
pub mod score;

pub use country::country_to_iso;
pub use index::{Candidate, CandidateIndex, IndexConfig, IndexStats};
pub use normalize::{
    LegalForm, NormalizedKey, Normalizer, NormalizerConfig, normalize_registry_id,
};
pub use resolve::{Resolver, ScoredCandidate, classify, compare_scored};
pub use score::{ScoreBreakdown, score, score_breakdown};
