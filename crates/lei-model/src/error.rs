use thiserror::Error;

/// Invalid match or normalizer configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("auto threshold {auto} is below review threshold {review}")]
    ThresholdOrder { auto: f64, review: f64 },

    #[error("max_candidates must be at least 1")]
    NoCandidates,

    #[error("legal form '{canonical}' is empty or contains spaces")]
    InvalidLegalForm { canonical: String },

    #[error("empty legal form alias for '{canonical}'")]
    EmptyAlias { canonical: String },

    /// Phrase aliases may not contain a canonical form, otherwise a second
    /// normalization pass could rewrite the output again.
    #[error("legal form alias '{alias}' contains the canonical form '{token}'")]
    CanonicalTokenInAlias { alias: String, token: String },

    #[error("legal form alias '{alias}' maps to both '{first}' and '{second}'")]
    ConflictingAlias {
        alias: String,
        first: String,
        second: String,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
