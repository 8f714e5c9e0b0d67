//! In-memory reference records.
//!
//! The record layout is chosen once at load time. A full table and a slim
//! table are different vectors rather than one vector of optional fields, so
//! slim mode really does drop the unused columns from memory.

use std::collections::BTreeSet;

use crate::schema::{LoadMode, ReferenceField};

/// Position of a record inside a [`RecordStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(u32);

impl RecordId {
    /// Creates an id from a vector index, or `None` past `u32::MAX`.
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A reference row with every supported column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullRecord {
    pub lei: Box<str>,
    pub legal_name: Box<str>,
    pub other_names: Box<[Box<str>]>,
    pub jurisdiction: Box<str>,
    pub entity_status: Box<str>,
    pub registration_status: Box<str>,
    pub registration_authority: Box<str>,
    pub registry_entity_id: Box<str>,
}

/// A reference row reduced to the columns needed for name matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlimRecord {
    pub lei: Box<str>,
    pub legal_name: Box<str>,
}

/// Borrowed view over either record layout.
#[derive(Debug, Clone, Copy)]
pub enum RecordRef<'a> {
    Full(&'a FullRecord),
    Slim(&'a SlimRecord),
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}

impl<'a> RecordRef<'a> {
    pub fn lei(&self) -> &'a str {
        match self {
            RecordRef::Full(r) => &r.lei,
            RecordRef::Slim(r) => &r.lei,
        }
    }

    pub fn legal_name(&self) -> &'a str {
        match self {
            RecordRef::Full(r) => &r.legal_name,
            RecordRef::Slim(r) => &r.legal_name,
        }
    }

    pub fn other_names(&self) -> &'a [Box<str>] {
        match self {
            RecordRef::Full(r) => &r.other_names,
            RecordRef::Slim(_) => &[],
        }
    }

    pub fn jurisdiction(&self) -> Option<&'a str> {
        match self {
            RecordRef::Full(r) => non_empty(&r.jurisdiction),
            RecordRef::Slim(_) => None,
        }
    }

    pub fn entity_status(&self) -> Option<&'a str> {
        match self {
            RecordRef::Full(r) => non_empty(&r.entity_status),
            RecordRef::Slim(_) => None,
        }
    }

    pub fn registration_status(&self) -> Option<&'a str> {
        match self {
            RecordRef::Full(r) => non_empty(&r.registration_status),
            RecordRef::Slim(_) => None,
        }
    }

    pub fn registration_authority(&self) -> Option<&'a str> {
        match self {
            RecordRef::Full(r) => non_empty(&r.registration_authority),
            RecordRef::Slim(_) => None,
        }
    }

    pub fn registry_entity_id(&self) -> Option<&'a str> {
        match self {
            RecordRef::Full(r) => non_empty(&r.registry_entity_id),
            RecordRef::Slim(_) => None,
        }
    }

    /// Returns true when the entity status is `ACTIVE`.
    ///
    /// Slim records carry no status and are never considered active.
    pub fn is_active(&self) -> bool {
        self.entity_status()
            .is_some_and(|status| status.trim().eq_ignore_ascii_case("ACTIVE"))
    }

    /// Legal name followed by the other registered names.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        std::iter::once(self.legal_name()).chain(self.other_names().iter().map(|n| &**n))
    }
}

/// Records of one load, in file order.
#[derive(Debug, Clone)]
pub enum RecordStore {
    Full(Vec<FullRecord>),
    Slim(Vec<SlimRecord>),
}

impl RecordStore {
    pub fn empty(mode: LoadMode) -> Self {
        match mode {
            LoadMode::Full => RecordStore::Full(Vec::new()),
            LoadMode::Slim => RecordStore::Slim(Vec::new()),
        }
    }

    pub fn mode(&self) -> LoadMode {
        match self {
            RecordStore::Full(_) => LoadMode::Full,
            RecordStore::Slim(_) => LoadMode::Slim,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordStore::Full(rows) => rows.len(),
            RecordStore::Slim(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: RecordId) -> Option<RecordRef<'_>> {
        match self {
            RecordStore::Full(rows) => rows.get(id.index()).map(RecordRef::Full),
            RecordStore::Slim(rows) => rows.get(id.index()).map(RecordRef::Slim),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, RecordRef<'_>)> + '_ {
        (0..self.len()).filter_map(move |index| {
            let id = RecordId::from_index(index)?;
            self.get(id).map(|record| (id, record))
        })
    }

    /// Releases spare vector capacity left over from loading.
    pub fn shrink_to_fit(&mut self) {
        match self {
            RecordStore::Full(rows) => rows.shrink_to_fit(),
            RecordStore::Slim(rows) => rows.shrink_to_fit(),
        }
    }
}

/// The loaded reference dataset.
///
/// Immutable once built; the loader is the only producer.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    store: RecordStore,
    fields: BTreeSet<ReferenceField>,
}

impl ReferenceTable {
    /// Creates a table from loaded records and the fields whose columns were
    /// present in the source file.
    pub fn new(store: RecordStore, fields: BTreeSet<ReferenceField>) -> Self {
        let retained = store.mode().retained_fields();
        let fields = fields
            .into_iter()
            .filter(|field| retained.contains(field))
            .collect();
        Self { store, fields }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn mode(&self) -> LoadMode {
        self.store.mode()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<RecordRef<'_>> {
        self.store.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, RecordRef<'_>)> + '_ {
        self.store.iter()
    }

    /// Returns true if the field was loaded and retained.
    pub fn has_field(&self, field: ReferenceField) -> bool {
        self.fields.contains(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = ReferenceField> + '_ {
        self.fields.iter().copied()
    }
}
