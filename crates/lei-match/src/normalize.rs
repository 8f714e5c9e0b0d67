//! Entity-name normalization.
//!
//! One routine serves both sides of a comparison: reference names are
//! normalized once when the index is built and queries once per lookup.
//! The steps run in a fixed order:
//!
//! 1. lowercase, NFKD decomposition, combining marks dropped, lowercase again
//! 2. dots and apostrophes deleted, any other non-alphanumeric becomes a space
//! 3. whitespace tokenization
//! 4. legal forms rewritten to a canonical token (`limited` -> `ltd`,
//!    `gesellschaft mit beschrankter haftung` -> `gmbh`), longest phrase first
//! 5. tokens joined with single spaces

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use lei_model::ConfigError;

/// Normalized form of one name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NormalizedKey {
    /// Tokens joined with single spaces.
    pub text: String,
    /// Tokens in input order, legal forms already canonical.
    pub tokens: Vec<String>,
    /// Distinct tokens used for candidate blocking: every token that is not a
    /// legal form, or every token when the name is made only of legal forms.
    pub blocking_tokens: Vec<String>,
}

impl NormalizedKey {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// One legal form and the spellings that map to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalForm {
    pub canonical: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LegalForm {
    pub fn new(canonical: &str, aliases: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            aliases: aliases.iter().map(|alias| (*alias).to_string()).collect(),
        }
    }
}

/// Legal-form table used by the [`Normalizer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub legal_forms: Vec<LegalForm>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            legal_forms: default_legal_forms(),
        }
    }
}

fn default_legal_forms() -> Vec<LegalForm> {
    vec![
        // French
        LegalForm::new("sa", &["societe anonyme"]),
        LegalForm::new("sas", &["societe par actions simplifiee"]),
        LegalForm::new("sasu", &["societe par actions simplifiee unipersonnelle"]),
        LegalForm::new("sarl", &["societe a responsabilite limitee"]),
        LegalForm::new(
            "eurl",
            &["entreprise unipersonnelle a responsabilite limitee"],
        ),
        LegalForm::new("snc", &["societe en nom collectif"]),
        LegalForm::new("sci", &["societe civile immobiliere"]),
        LegalForm::new("scm", &["societe civile de moyens"]),
        LegalForm::new("scp", &["societe civile professionnelle"]),
        LegalForm::new("scs", &["societe en commandite simple"]),
        LegalForm::new("sc", &["societe civile"]),
        LegalForm::new("gie", &["groupement d'interet economique"]),
        // German, Dutch, Italian
        LegalForm::new("gmbh", &["gesellschaft mit beschrankter haftung"]),
        LegalForm::new("ag", &["aktiengesellschaft"]),
        LegalForm::new("kg", &["kommanditgesellschaft"]),
        LegalForm::new("bv", &["besloten vennootschap"]),
        LegalForm::new("nv", &["naamloze vennootschap"]),
        LegalForm::new("spa", &["societa per azioni"]),
        LegalForm::new("srl", &["societa a responsabilita limitata"]),
        // English
        LegalForm::new("ltd", &["limited"]),
        LegalForm::new("plc", &["public limited company"]),
        LegalForm::new("llc", &["limited liability company"]),
        LegalForm::new("llp", &["limited liability partnership"]),
        LegalForm::new("lp", &["limited partnership"]),
        LegalForm::new("inc", &["incorporated"]),
        LegalForm::new("corp", &["corporation"]),
        LegalForm::new("co", &["company"]),
    ]
}

/// Splits `text` into folded tokens (steps 1 to 3).
fn fold_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut folded = String::with_capacity(lowered.len());
    for ch in lowered.nfkd().filter(|ch| !is_combining_mark(*ch)) {
        folded.extend(ch.to_lowercase());
    }
    let mut cleaned = String::with_capacity(folded.len());
    for ch in folded.chars() {
        match ch {
            '.' | '\'' | '\u{2019}' | '\u{2018}' | '`' => {}
            ch if ch.is_alphanumeric() => cleaned.push(ch),
            _ => cleaned.push(' '),
        }
    }
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Deterministic entity-name normalizer.
///
/// Cheap to share: the legal-form tables are read-only after construction.
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Single-token spelling to canonical token; canonical tokens map to themselves.
    single: HashMap<String, String>,
    /// First token of a phrase to (phrase tokens, canonical), longest first.
    phrases: HashMap<String, Vec<(Vec<String>, String)>>,
    canonical: HashSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::build(&NormalizerConfig::default())
    }
}

impl Normalizer {
    /// Validates `config` and builds a normalizer from it.
    pub fn new(config: &NormalizerConfig) -> Result<Self, ConfigError> {
        validate(config)?;
        Ok(Self::build(config))
    }

    fn build(config: &NormalizerConfig) -> Self {
        let mut single = HashMap::new();
        let mut phrases: HashMap<String, Vec<(Vec<String>, String)>> = HashMap::new();
        let mut canonical = HashSet::new();

        for form in &config.legal_forms {
            let Some(token) = single_token(&form.canonical) else {
                continue;
            };
            canonical.insert(token.clone());
            single.insert(token.clone(), token.clone());
        }
        for form in &config.legal_forms {
            let Some(token) = single_token(&form.canonical) else {
                continue;
            };
            for alias in &form.aliases {
                let tokens = fold_tokens(alias);
                match tokens.len() {
                    0 => {}
                    1 => {
                        single
                            .entry(tokens[0].clone())
                            .or_insert_with(|| token.clone());
                    }
                    _ => phrases
                        .entry(tokens[0].clone())
                        .or_default()
                        .push((tokens, token.clone())),
                }
            }
        }
        for list in phrases.values_mut() {
            list.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        }

        Self {
            single,
            phrases,
            canonical,
        }
    }

    /// Returns true if `token` is a canonical legal form.
    pub fn is_legal_form(&self, token: &str) -> bool {
        self.canonical.contains(token)
    }

    /// Normalizes `text`. Never fails; unusable input gives an empty key.
    pub fn normalize(&self, text: &str) -> NormalizedKey {
        let raw = fold_tokens(text);
        let mut tokens = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if let Some((len, canonical)) = self.match_phrase(&raw[i..]) {
                tokens.push(canonical.to_string());
                i += len;
                continue;
            }
            let token = &raw[i];
            tokens.push(self.single.get(token).unwrap_or(token).clone());
            i += 1;
        }

        let mut blocking_tokens: Vec<String> = Vec::new();
        for token in tokens.iter().filter(|t| !self.is_legal_form(t)) {
            if !blocking_tokens.contains(token) {
                blocking_tokens.push(token.clone());
            }
        }
        if blocking_tokens.is_empty() {
            for token in &tokens {
                if !blocking_tokens.contains(token) {
                    blocking_tokens.push(token.clone());
                }
            }
        }

        NormalizedKey {
            text: tokens.join(" "),
            tokens,
            blocking_tokens,
        }
    }

    fn match_phrase(&self, rest: &[String]) -> Option<(usize, &str)> {
        let first = rest.first()?;
        self.phrases
            .get(first)?
            .iter()
            .find(|(phrase, _)| rest.starts_with(phrase))
            .map(|(phrase, canonical)| (phrase.len(), canonical.as_str()))
    }
}

fn single_token(text: &str) -> Option<String> {
    let mut tokens = fold_tokens(text);
    if tokens.len() == 1 { tokens.pop() } else { None }
}

/// Checks that the legal-form table keeps normalization idempotent.
pub fn validate(config: &NormalizerConfig) -> Result<(), ConfigError> {
    let mut canonical = HashSet::new();
    for form in &config.legal_forms {
        let token = single_token(&form.canonical).ok_or_else(|| ConfigError::InvalidLegalForm {
            canonical: form.canonical.clone(),
        })?;
        canonical.insert(token);
    }

    let mut owners: HashMap<Vec<String>, String> = HashMap::new();
    for form in &config.legal_forms {
        let target = single_token(&form.canonical).unwrap_or_default();
        for alias in &form.aliases {
            let tokens = fold_tokens(alias);
            if tokens.is_empty() {
                return Err(ConfigError::EmptyAlias {
                    canonical: form.canonical.clone(),
                });
            }
            if tokens.len() == 1 && canonical.contains(&tokens[0]) && tokens[0] != target {
                return Err(ConfigError::ConflictingAlias {
                    alias: alias.clone(),
                    first: tokens[0].clone(),
                    second: target,
                });
            }
            if tokens.len() > 1
                && let Some(token) = tokens.iter().find(|t| canonical.contains(*t))
            {
                return Err(ConfigError::CanonicalTokenInAlias {
                    alias: alias.clone(),
                    token: token.clone(),
                });
            }
            if let Some(first) = owners.get(&tokens)
                && *first != target
            {
                return Err(ConfigError::ConflictingAlias {
                    alias: alias.clone(),
                    first: first.clone(),
                    second: target,
                });
            }
            owners.insert(tokens, target.clone());
        }
    }
    Ok(())
}

/// Normalizes a registration-authority identifier (RCS, SIREN, company
/// number): uppercase, an `RCS <city>` prefix removed, ASCII alphanumerics
/// kept.
///
/// `"RCS Paris 552 120 222"` becomes `"552120222"`.
pub fn normalize_registry_id(value: &str) -> String {
    let upper = value.trim().to_uppercase();
    let rest = match upper.strip_prefix("RCS") {
        Some(rest) if rest.starts_with(char::is_whitespace) => {
            rest.trim_start_matches(|ch: char| ch.is_alphabetic() || ch.is_whitespace())
        }
        _ => upper.as_str(),
    };
    rest.chars().filter(char::is_ascii_alphanumeric).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> String {
        Normalizer::default().normalize(value).text
    }

    #[test]
    fn test_punctuation_and_legal_forms() {
        assert_eq!(text("ACME CORP. LTD"), "acme corp ltd");
        assert_eq!(text("Acme Corporation Limited"), "acme corp ltd");
        assert_eq!(text("Dupont S.A.R.L."), "dupont sarl");
        assert_eq!(text("L'Oréal S.A."), "loreal sa");
        assert_eq!(text("Müller & Söhne GmbH"), "muller sohne gmbh");
        assert_eq!(
            text("Müller Gesellschaft mit beschränkter Haftung"),
            "muller gmbh"
        );
    }

    #[test]
    fn test_longest_phrase_wins() {
        assert_eq!(text("Acme Limited Liability Partnership"), "acme llp");
        assert_eq!(text("Acme Limited Partnership"), "acme lp");
        assert_eq!(text("Acme Limited"), "acme ltd");
    }

    #[test]
    fn test_blocking_tokens_skip_legal_forms() {
        let key = Normalizer::default().normalize("Acme Acme Holding SA");
        assert_eq!(key.tokens, ["acme", "acme", "holding", "sa"]);
        assert_eq!(key.blocking_tokens, ["acme", "holding"]);

        let only_forms = Normalizer::default().normalize("S.A.");
        assert_eq!(only_forms.blocking_tokens, ["sa"]);
    }

    #[test]
    fn test_empty_and_symbol_only_input() {
        assert!(Normalizer::default().normalize("").is_empty());
        assert!(Normalizer::default().normalize(" -- ?! ").is_empty());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&NormalizerConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_rejects_canonical_tokens_in_phrases() {
        let config = NormalizerConfig {
            legal_forms: vec![
                LegalForm::new("co", &["company"]),
                LegalForm::new("ltd", &["limited"]),
                LegalForm::new("coltd", &["co ltd"]),
            ],
        };
        assert!(matches!(
            Normalizer::new(&config),
            Err(ConfigError::CanonicalTokenInAlias { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_conflicts() {
        let config = NormalizerConfig {
            legal_forms: vec![
                LegalForm::new("ltd", &["limited"]),
                LegalForm::new("lim", &["limited"]),
            ],
        };
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ConflictingAlias { .. })
        ));

        let bad_canonical = NormalizerConfig {
            legal_forms: vec![LegalForm::new("two words", &[])],
        };
        assert!(matches!(
            validate(&bad_canonical),
            Err(ConfigError::InvalidLegalForm { .. })
        ));
    }

    #[test]
    fn test_registry_id_normalization() {
        assert_eq!(normalize_registry_id("RCS Paris 552 120 222"), "552120222");
        assert_eq!(normalize_registry_id("rcs Nanterre B 123.456.789"), "123456789");
        assert_eq!(normalize_registry_id("123.456.789 B"), "123456789B");
        assert_eq!(normalize_registry_id("HRB 12345"), "HRB12345");
        assert_eq!(normalize_registry_id("  "), "");
    }
}
