//! Reference dataset schema: which fields exist and how their columns are named.
//!
//! The GLEIF golden copy uses dotted column names (`Entity.LegalName`,
//! `Registration.RegistrationStatus`, ...). Older extracts and hand-made
//! test files use shorter names, so every field accepts a list of aliases
//! compared case-insensitively.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A logical field of a reference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceField {
    /// The 20-character Legal Entity Identifier.
    Lei,
    /// Primary registered legal name.
    LegalName,
    /// Other registered names (trading names, previous names, transliterations).
    OtherNames,
    /// Legal jurisdiction or legal-address country (ISO 3166 alpha-2).
    Jurisdiction,
    /// Entity status (`ACTIVE`, `INACTIVE`, ...).
    EntityStatus,
    /// LEI registration status (`ISSUED`, `LAPSED`, `RETIRED`, ...).
    RegistrationStatus,
    /// Registration authority code (`RA000189`, ...).
    RegistrationAuthority,
    /// Identifier of the entity at its registration authority (RCS, SIREN, company number).
    RegistryEntityId,
}

impl ReferenceField {
    pub const ALL: [ReferenceField; 8] = [
        ReferenceField::Lei,
        ReferenceField::LegalName,
        ReferenceField::OtherNames,
        ReferenceField::Jurisdiction,
        ReferenceField::EntityStatus,
        ReferenceField::RegistrationStatus,
        ReferenceField::RegistrationAuthority,
        ReferenceField::RegistryEntityId,
    ];

    /// Returns the short name used in messages and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceField::Lei => "lei",
            ReferenceField::LegalName => "legal_name",
            ReferenceField::OtherNames => "other_names",
            ReferenceField::Jurisdiction => "jurisdiction",
            ReferenceField::EntityStatus => "entity_status",
            ReferenceField::RegistrationStatus => "registration_status",
            ReferenceField::RegistrationAuthority => "registration_authority",
            ReferenceField::RegistryEntityId => "registry_entity_id",
        }
    }

    /// Header names accepted for this field, golden-copy name first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ReferenceField::Lei => &["LEI", "LEI Code"],
            ReferenceField::LegalName => &["Entity.LegalName", "LegalName", "Legal Name", "Name"],
            ReferenceField::OtherNames => &["Entity.OtherEntityNames.OtherEntityName", "OtherNames"],
            ReferenceField::Jurisdiction => &[
                "Entity.LegalAddress.Country",
                "Entity.LegalJurisdiction",
                "Jurisdiction",
                "Country",
            ],
            ReferenceField::EntityStatus => &["Entity.EntityStatus", "EntityStatus", "Status"],
            ReferenceField::RegistrationStatus => &[
                "Registration.RegistrationStatus",
                "RegistrationStatus",
            ],
            ReferenceField::RegistrationAuthority => &[
                "Registration.RegistrationAuthorityID",
                "Entity.RegistrationAuthority.RegistrationAuthorityID",
                "RegistrationAuthorityID",
            ],
            ReferenceField::RegistryEntityId => &[
                "Registration.RegistrationAuthorityEntityID",
                "Entity.RegistrationAuthority.RegistrationAuthorityEntityID",
                "RegistrationAuthorityEntityID",
            ],
        }
    }

    /// Returns true if this field may span several numbered columns
    /// (`Entity.OtherEntityNames.OtherEntityName.1`, `.2`, ...).
    pub fn is_repeated(&self) -> bool {
        matches!(self, ReferenceField::OtherNames)
    }

    /// Returns true if `header` names this field.
    ///
    /// Repeated fields also match their numbered variants.
    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim().trim_matches('\u{feff}');
        self.aliases().iter().any(|alias| {
            if header.eq_ignore_ascii_case(alias) {
                return true;
            }
            if !self.is_repeated() || header.len() <= alias.len() {
                return false;
            }
            let (head, tail) = header.split_at(alias.len());
            head.eq_ignore_ascii_case(alias)
                && tail
                    .strip_prefix('.')
                    .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        })
    }
}

impl fmt::Display for ReferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column projection chosen when the reference file is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Every supported column is retained.
    #[default]
    Full,
    /// Only LEI and legal name are retained.
    Slim,
}

impl LoadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMode::Full => "full",
            LoadMode::Slim => "slim",
        }
    }

    /// Fields that must be present in the file header for this mode.
    pub fn required_fields(&self) -> &'static [ReferenceField] {
        match self {
            LoadMode::Full => &[
                ReferenceField::Lei,
                ReferenceField::LegalName,
                ReferenceField::EntityStatus,
                ReferenceField::Jurisdiction,
            ],
            LoadMode::Slim => &[ReferenceField::Lei, ReferenceField::LegalName],
        }
    }

    /// Fields kept in memory for this mode.
    pub fn retained_fields(&self) -> &'static [ReferenceField] {
        match self {
            LoadMode::Full => &ReferenceField::ALL,
            LoadMode::Slim => &[ReferenceField::Lei, ReferenceField::LegalName],
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(LoadMode::Full),
            "slim" => Ok(LoadMode::Slim),
            _ => Err(format!("Unknown load mode: {s}")),
        }
    }
}

/// Options for loading the reference dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub mode: LoadMode,
    /// Keep only entities that are `ACTIVE` with an `ISSUED` LEI.
    pub active_only: bool,
}

impl LoadOptions {
    pub fn new(mode: LoadMode) -> Self {
        Self {
            mode,
            active_only: false,
        }
    }

    #[must_use]
    pub fn with_active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }

    /// Fields that must be present in the header, including the ones the
    /// active-only filter reads.
    pub fn required_fields(&self) -> Vec<ReferenceField> {
        let mut fields = self.mode.required_fields().to_vec();
        if self.active_only && !fields.contains(&ReferenceField::EntityStatus) {
            fields.push(ReferenceField::EntityStatus);
        }
        fields
    }
}
