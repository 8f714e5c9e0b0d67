//! Match thresholds and result caps.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Thresholds and caps applied when resolving one query.
///
/// Scores are in `[0, 1]`:
/// - At or above `auto_threshold`: [`Classification::AutoMatched`](crate::Classification::AutoMatched)
/// - `review_threshold` to `auto_threshold`: [`Classification::NeedsReview`](crate::Classification::NeedsReview)
/// - Below `review_threshold`: [`Classification::NoMatch`](crate::Classification::NoMatch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum score for an automatic match (default: 0.92).
    pub auto_threshold: f64,
    /// Minimum score for a suggestion that needs review (default: 0.80).
    pub review_threshold: f64,
    /// Candidates scored per query (default: 100).
    pub max_candidates: usize,
    /// Alternatives reported per query (default: 3).
    pub max_alternatives: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            auto_threshold: 0.92,
            review_threshold: 0.80,
            max_candidates: 100,
            max_alternatives: 3,
        }
    }
}

impl MatchConfig {
    /// Thresholds for batches where false positives are expensive.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            auto_threshold: 0.97,
            review_threshold: 0.88,
            ..Self::default()
        }
    }

    /// Thresholds for exploratory runs that favour recall.
    #[must_use]
    pub fn relaxed() -> Self {
        Self {
            auto_threshold: 0.88,
            review_threshold: 0.70,
            max_candidates: 200,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, auto: f64, review: f64) -> Self {
        self.auto_threshold = auto;
        self.review_threshold = review;
        self
    }

    #[must_use]
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    #[must_use]
    pub fn with_max_alternatives(mut self, max_alternatives: usize) -> Self {
        self.max_alternatives = max_alternatives;
        self
    }

    /// Checks threshold ranges and ordering.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("auto_threshold", self.auto_threshold),
            ("review_threshold", self.review_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.auto_threshold < self.review_threshold {
            return Err(ConfigError::ThresholdOrder {
                auto: self.auto_threshold,
                review: self.review_threshold,
            });
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::NoCandidates);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for config in [
            MatchConfig::default(),
            MatchConfig::strict(),
            MatchConfig::relaxed(),
        ] {
            assert!(config.validate().is_ok(), "{config:?}");
        }
        assert!(MatchConfig::strict().auto_threshold > MatchConfig::relaxed().auto_threshold);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let inverted = MatchConfig::default().with_thresholds(0.5, 0.8);
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::ThresholdOrder {
                auto: 0.5,
                review: 0.8
            })
        );

        let out_of_range = MatchConfig::default().with_thresholds(1.2, 0.8);
        assert!(matches!(
            out_of_range.validate(),
            Err(ConfigError::ThresholdOutOfRange {
                name: "auto_threshold",
                ..
            })
        ));

        let nan = MatchConfig::default().with_thresholds(0.9, f64::NAN);
        assert!(nan.validate().is_err());

        let no_candidates = MatchConfig::default().with_max_candidates(0);
        assert_eq!(no_candidates.validate(), Err(ConfigError::NoCandidates));
    }

    #[test]
    fn test_equal_thresholds_are_allowed() {
        let config = MatchConfig::default().with_thresholds(0.85, 0.85);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: MatchConfig = serde_json::from_str(r#"{"auto_threshold": 0.95}"#).unwrap();
        assert_eq!(config.auto_threshold, 0.95);
        assert_eq!(config.review_threshold, 0.80);
        assert_eq!(config.max_alternatives, 3);
    }
}
