//! Country names to ISO 3166-1 alpha-2 codes.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// French and English names, folded (lowercase, no accents, single spaces).
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("france", "FR"),
    ("allemagne", "DE"),
    ("germany", "DE"),
    ("italie", "IT"),
    ("italy", "IT"),
    ("espagne", "ES"),
    ("spain", "ES"),
    ("belgique", "BE"),
    ("belgium", "BE"),
    ("suisse", "CH"),
    ("switzerland", "CH"),
    ("luxembourg", "LU"),
    ("pays bas", "NL"),
    ("netherlands", "NL"),
    ("hollande", "NL"),
    ("royaume uni", "GB"),
    ("united kingdom", "GB"),
    ("uk", "GB"),
    ("angleterre", "GB"),
    ("england", "GB"),
    ("etats unis", "US"),
    ("united states", "US"),
    ("usa", "US"),
    ("portugal", "PT"),
    ("autriche", "AT"),
    ("austria", "AT"),
    ("suede", "SE"),
    ("sweden", "SE"),
    ("danemark", "DK"),
    ("denmark", "DK"),
    ("norvege", "NO"),
    ("norway", "NO"),
    ("finlande", "FI"),
    ("finland", "FI"),
    ("pologne", "PL"),
    ("poland", "PL"),
    ("republique tcheque", "CZ"),
    ("czech republic", "CZ"),
    ("czechia", "CZ"),
    ("irlande", "IE"),
    ("ireland", "IE"),
    ("grece", "GR"),
    ("greece", "GR"),
    ("roumanie", "RO"),
    ("romania", "RO"),
    ("hongrie", "HU"),
    ("hungary", "HU"),
    ("japon", "JP"),
    ("japan", "JP"),
    ("chine", "CN"),
    ("china", "CN"),
    ("canada", "CA"),
    ("australie", "AU"),
    ("australia", "AU"),
    ("singapour", "SG"),
    ("singapore", "SG"),
    ("emirats arabes unis", "AE"),
    ("uae", "AE"),
    ("monaco", "MC"),
    ("liechtenstein", "LI"),
    ("andorre", "AD"),
    ("andorra", "AD"),
    ("ile maurice", "MU"),
    ("mauritius", "MU"),
    ("maroc", "MA"),
    ("morocco", "MA"),
];

fn fold(value: &str) -> String {
    let folded: String = value
        .to_lowercase()
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .map(|ch| if ch.is_alphanumeric() { ch } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Converts a country code or name to an uppercase ISO alpha-2 code.
///
/// Two ASCII letters pass through unchanged; anything else is looked up by
/// folded name. Returns `None` when the value is empty or unknown.
pub fn country_to_iso(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Some(trimmed.to_ascii_uppercase());
    }
    let key = fold(trimmed);
    if key.is_empty() {
        return None;
    }
    COUNTRY_NAMES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, code)| (*code).to_string())
}
