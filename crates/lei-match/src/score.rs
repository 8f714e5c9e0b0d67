//! Name similarity scoring.
//!
//! Three symmetric measures are computed over normalized names and the best
//! one wins:
//! - token sort: Indel similarity of the sorted tokens, insensitive to word order
//! - token set: similarity of the shared tokens against each full name,
//!   tolerant of missing or extra words
//! - Jaro-Winkler over the sorted text, tolerant of typos near the start
//!
//! Token set and Jaro-Winkler are damped so that only token sort (or an exact
//! normalized match) can reach the automatic-match range on its own.

use rapidfuzz::distance::{indel, jaro_winkler};

use crate::normalize::NormalizedKey;

/// Weight applied to the token-set ratio.
const TOKEN_SET_WEIGHT: f64 = 0.90;
/// Weight applied to the Jaro-Winkler similarity.
const JARO_WINKLER_WEIGHT: f64 = 0.90;

/// Component values behind a score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    /// Final score in `[0, 1]`.
    pub score: f64,
    pub exact: bool,
    pub token_sort: f64,
    pub token_set: f64,
    pub jaro_winkler: f64,
}

impl ScoreBreakdown {
    /// Human-readable explanation of the score.
    pub fn explain(&self) -> String {
        if self.exact {
            return "exact normalized match".to_string();
        }
        [
            ("token sort", self.token_sort),
            ("token set", self.token_set),
            ("jaro-winkler", self.jaro_winkler),
        ]
        .iter()
        .map(|(name, value)| format!("{name}: {:.0}%", value * 100.0))
        .collect::<Vec<_>>()
        .join("; ")
    }
}

/// Similarity of two normalized names in `[0, 1]`.
pub fn score(a: &NormalizedKey, b: &NormalizedKey) -> f64 {
    score_breakdown(a, b).score
}

pub fn score_breakdown(a: &NormalizedKey, b: &NormalizedKey) -> ScoreBreakdown {
    if a.is_empty() || b.is_empty() {
        return ScoreBreakdown {
            score: 0.0,
            exact: false,
            token_sort: 0.0,
            token_set: 0.0,
            jaro_winkler: 0.0,
        };
    }
    if a.text == b.text {
        return ScoreBreakdown {
            score: 1.0,
            exact: true,
            token_sort: 1.0,
            token_set: 1.0,
            jaro_winkler: 1.0,
        };
    }

    let sorted_a = sorted_text(&a.tokens);
    let sorted_b = sorted_text(&b.tokens);
    let token_sort = ratio(&sorted_a, &sorted_b);
    let token_set = token_set_ratio(&a.tokens, &b.tokens) * TOKEN_SET_WEIGHT;
    let jaro_winkler =
        jaro_winkler::similarity(sorted_a.chars(), sorted_b.chars()) * JARO_WINKLER_WEIGHT;

    let best = token_sort.max(token_set).max(jaro_winkler);
    ScoreBreakdown {
        score: best.clamp(0.0, 1.0),
        exact: false,
        token_sort,
        token_set,
        jaro_winkler,
    }
}

fn ratio(a: &str, b: &str) -> f64 {
    indel::normalized_similarity(a.chars(), b.chars())
}

fn sorted_text(tokens: &[String]) -> String {
    let mut sorted: Vec<&str> = tokens.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(" ")
}

/// Best ratio between the shared tokens and each side's full token set.
fn token_set_ratio(a: &[String], b: &[String]) -> f64 {
    let mut set_a: Vec<&str> = a.iter().map(String::as_str).collect();
    let mut set_b: Vec<&str> = b.iter().map(String::as_str).collect();
    set_a.sort_unstable();
    set_a.dedup();
    set_b.sort_unstable();
    set_b.dedup();

    let common: Vec<&str> = set_a
        .iter()
        .copied()
        .filter(|token| set_b.binary_search(token).is_ok())
        .collect();
    if common.is_empty() {
        return 0.0;
    }
    let only_a: Vec<&str> = set_a
        .iter()
        .copied()
        .filter(|token| common.binary_search(token).is_err())
        .collect();
    let only_b: Vec<&str> = set_b
        .iter()
        .copied()
        .filter(|token| common.binary_search(token).is_err())
        .collect();

    let shared = common.join(" ");
    let with = |rest: &[&str]| -> String {
        if rest.is_empty() {
            shared.clone()
        } else {
            format!("{shared} {}", rest.join(" "))
        }
    };
    let full_a = with(&only_a);
    let full_b = with(&only_b);

    ratio(&shared, &full_a)
        .max(ratio(&shared, &full_b))
        .max(ratio(&full_a, &full_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn pair(a: &str, b: &str) -> ScoreBreakdown {
        let normalizer = Normalizer::default();
        score_breakdown(&normalizer.normalize(a), &normalizer.normalize(b))
    }

    #[test]
    fn test_identical_normalized_text_scores_one() {
        let breakdown = pair("Acme Corporation Ltd", "ACME CORP. LTD");
        assert_eq!(breakdown.score, 1.0);
        assert!(breakdown.exact);
        assert_eq!(breakdown.explain(), "exact normalized match");
    }

    #[test]
    fn test_word_order_does_not_matter() {
        let breakdown = pair("Widgets Acme Ltd", "Acme Widgets Ltd");
        assert!((breakdown.token_sort - 1.0).abs() < 1e-9);
        assert!(breakdown.score > 0.99);
    }

    #[test]
    fn test_extra_words_are_damped() {
        let breakdown = pair("Acme", "Acme Holdings");
        assert!((breakdown.token_set - TOKEN_SET_WEIGHT).abs() < 1e-9);
        assert!(breakdown.score < 0.92);
        assert!(breakdown.score >= 0.80);
    }

    #[test]
    fn test_unrelated_names_score_low() {
        let breakdown = pair("Acme Corporation Ltd", "Zenith Bakery GmbH");
        assert!(breakdown.score < 0.6, "{}", breakdown.explain());
    }

    #[test]
    fn test_score_is_symmetric_and_bounded() {
        let normalizer = Normalizer::default();
        let names = ["Acme SA", "Acme SARL", "Acne S.A.", "Société Générale", ""];
        for a in names {
            for b in names {
                let ka = normalizer.normalize(a);
                let kb = normalizer.normalize(b);
                let ab = score(&ka, &kb);
                let ba = score(&kb, &ka);
                assert!((ab - ba).abs() < 1e-9, "{a} / {b}");
                assert!((0.0..=1.0).contains(&ab));
            }
        }
    }

    #[test]
    fn test_explain_lists_components() {
        let breakdown = pair("Acme Widgets", "Acme Gadgets");
        let explanation = breakdown.explain();
        assert!(explanation.contains("token sort"));
        assert!(explanation.contains("jaro-winkler"));
    }
}
