//! GLEIF golden-copy loader.
//!
//! The file is read in a single pass with the `csv` crate's byte records so a
//! stray invalid UTF-8 cell never aborts a multi-million row load. Columns are
//! resolved once from the header; each row is then projected straight into
//! the record layout of the requested [`LoadMode`].

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, info, info_span, warn};

use lei_model::{
    DuplicateKey, FullRecord, LoadOptions, LoadReport, RecordStore, ReferenceField,
    ReferenceTable, SlimRecord,
};

use crate::error::{LoadError, Result};

/// Reads the reference file at `path`.
pub fn load_reference(
    path: impl AsRef<Path>,
    options: LoadOptions,
) -> Result<(ReferenceTable, LoadReport)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::DataIo {
        path: path.to_path_buf(),
        source,
    })?;
    load_reference_from_reader(file, path, options)
}

/// Reads reference rows from any reader; `path` is only used in messages.
pub fn load_reference_from_reader<R: Read>(
    reader: R,
    path: &Path,
    options: LoadOptions,
) -> Result<(ReferenceTable, LoadReport)> {
    let span = info_span!("load_reference", path = %path.display(), mode = %options.mode);
    let _guard = span.enter();
    let start = Instant::now();

    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv
        .byte_headers()
        .map_err(|err| csv_error(path, err))?
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).into_owned())
        .collect::<Vec<_>>();
    let columns = ColumnMap::resolve(&headers, path, &options)?;
    debug!(columns = ?columns, "resolved reference columns");

    let mut loader = RowLoader::new(options, &columns);
    let mut record = ByteRecord::new();
    loop {
        match csv.read_byte_record(&mut record) {
            Ok(true) => {
                let line = record.position().map_or(0, csv::Position::line);
                loader.push(&record, line);
            }
            Ok(false) => break,
            Err(err) => return Err(csv_error(path, err)),
        }
    }

    let (table, report) = loader.finish(columns.present_fields());
    info!(
        rows = report.rows_read,
        records = report.records,
        duplicates = report.duplicate_count(),
        skipped_empty_lei = report.skipped_empty_lei,
        filtered_inactive = report.filtered_inactive,
        duration_ms = start.elapsed().as_millis(),
        "reference load complete"
    );
    Ok((table, report))
}

fn csv_error(path: &Path, err: csv::Error) -> LoadError {
    let line = err.position().map_or(0, csv::Position::line);
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => LoadError::DataIo {
            path: path.to_path_buf(),
            source,
        },
        _ => LoadError::Malformed {
            path: path.to_path_buf(),
            line,
            message,
        },
    }
}

/// Header positions of every field found in the file.
#[derive(Debug)]
struct ColumnMap {
    lei: usize,
    legal_name: usize,
    other_names: Vec<usize>,
    jurisdiction: Option<usize>,
    entity_status: Option<usize>,
    registration_status: Option<usize>,
    registration_authority: Option<usize>,
    registry_entity_id: Option<usize>,
}

fn find_column(headers: &[String], field: ReferenceField) -> Option<usize> {
    field.aliases().iter().find_map(|alias| {
        headers.iter().position(|header| {
            header
                .trim()
                .trim_matches('\u{feff}')
                .eq_ignore_ascii_case(alias)
        })
    })
}

impl ColumnMap {
    fn resolve(headers: &[String], path: &Path, options: &LoadOptions) -> Result<Self> {
        let mut required = options.required_fields();
        for field in [ReferenceField::Lei, ReferenceField::LegalName] {
            if !required.contains(&field) {
                required.push(field);
            }
        }
        let missing: Vec<String> = required
            .into_iter()
            .filter(|field| find_column(headers, *field).is_none())
            .map(|field| field.aliases()[0].to_string())
            .collect();

        let (Some(lei), Some(legal_name), true) = (
            find_column(headers, ReferenceField::Lei),
            find_column(headers, ReferenceField::LegalName),
            missing.is_empty(),
        ) else {
            return Err(LoadError::DataFormat {
                path: path.to_path_buf(),
                missing,
                available: headers.to_vec(),
            });
        };

        let other_names = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| ReferenceField::OtherNames.matches_header(header))
            .map(|(index, _)| index)
            .collect();

        Ok(Self {
            lei,
            legal_name,
            other_names,
            jurisdiction: find_column(headers, ReferenceField::Jurisdiction),
            entity_status: find_column(headers, ReferenceField::EntityStatus),
            registration_status: find_column(headers, ReferenceField::RegistrationStatus),
            registration_authority: find_column(headers, ReferenceField::RegistrationAuthority),
            registry_entity_id: find_column(headers, ReferenceField::RegistryEntityId),
        })
    }

    fn present_fields(&self) -> BTreeSet<ReferenceField> {
        let optional = [
            (ReferenceField::OtherNames, !self.other_names.is_empty()),
            (ReferenceField::Jurisdiction, self.jurisdiction.is_some()),
            (ReferenceField::EntityStatus, self.entity_status.is_some()),
            (
                ReferenceField::RegistrationStatus,
                self.registration_status.is_some(),
            ),
            (
                ReferenceField::RegistrationAuthority,
                self.registration_authority.is_some(),
            ),
            (
                ReferenceField::RegistryEntityId,
                self.registry_entity_id.is_some(),
            ),
        ];
        let mut fields = BTreeSet::from([ReferenceField::Lei, ReferenceField::LegalName]);
        fields.extend(
            optional
                .into_iter()
                .filter(|(_, present)| *present)
                .map(|(field, _)| field),
        );
        fields
    }
}

/// Accumulates records and report counters for one load.
struct RowLoader<'a> {
    options: LoadOptions,
    columns: &'a ColumnMap,
    store: RecordStore,
    report: LoadReport,
    /// LEI to (record index, source line of the latest row). The index is
    /// `None` while no row for the LEI has passed the status filter.
    seen: HashMap<Box<str>, (Option<usize>, u64)>,
    /// Records superseded by a later row that the status filter rejected.
    vacated: BTreeSet<usize>,
}

impl<'a> RowLoader<'a> {
    fn new(options: LoadOptions, columns: &'a ColumnMap) -> Self {
        Self {
            options,
            columns,
            store: RecordStore::empty(options.mode),
            report: LoadReport::default(),
            seen: HashMap::new(),
            vacated: BTreeSet::new(),
        }
    }

    fn push(&mut self, record: &ByteRecord, line: u64) {
        self.report.rows_read += 1;
        let columns = self.columns;
        let mut lossy = false;
        let mut cell = |index: Option<usize>| -> Box<str> {
            let Some(bytes) = index.and_then(|i| record.get(i)) else {
                return Box::from("");
            };
            let text = String::from_utf8_lossy(bytes);
            if matches!(text, Cow::Owned(_)) {
                lossy = true;
            }
            Box::from(text.trim())
        };

        let lei: Box<str> = cell(Some(columns.lei)).to_ascii_uppercase().into();
        if lei.is_empty() {
            self.report.skipped_empty_lei += 1;
            debug!(line, "skipping reference row without LEI");
            return;
        }

        if self.options.active_only {
            let entity_status = cell(columns.entity_status);
            let registration_status = cell(columns.registration_status);
            let active = entity_status.eq_ignore_ascii_case("ACTIVE")
                && (columns.registration_status.is_none()
                    || registration_status.eq_ignore_ascii_case("ISSUED"));
            if !active {
                self.report.filtered_inactive += 1;
                let slot = self.seen.get(&lei).and_then(|(index, _)| *index);
                if let Some(index) = slot {
                    self.vacated.insert(index);
                }
                self.supersede(lei, slot, line);
                return;
            }
        }

        let slot = self.seen.get(&lei).and_then(|(index, _)| *index);
        let legal_name = cell(Some(columns.legal_name));
        let index = match &mut self.store {
            RecordStore::Slim(rows) => place(
                rows,
                slot,
                SlimRecord {
                    lei: lei.clone(),
                    legal_name,
                },
            ),
            RecordStore::Full(rows) => {
                let mut other_names: Vec<Box<str>> = Vec::new();
                for index in &columns.other_names {
                    let name = cell(Some(*index));
                    if !name.is_empty() && name != legal_name && !other_names.contains(&name) {
                        other_names.push(name);
                    }
                }
                let record = FullRecord {
                    lei: lei.clone(),
                    legal_name,
                    other_names: other_names.into_boxed_slice(),
                    jurisdiction: cell(columns.jurisdiction).to_ascii_uppercase().into(),
                    entity_status: cell(columns.entity_status),
                    registration_status: cell(columns.registration_status),
                    registration_authority: cell(columns.registration_authority),
                    registry_entity_id: cell(columns.registry_entity_id),
                };
                place(rows, slot, record)
            }
        };
        if lossy {
            self.report.lossy_rows += 1;
        }
        self.vacated.remove(&index);
        self.supersede(lei, Some(index), line);
    }

    /// Makes `line` the latest row for `lei`, recording the earlier row as dropped.
    fn supersede(&mut self, lei: Box<str>, index: Option<usize>, line: u64) {
        if let Some((_, previous_line)) = self.seen.insert(lei.clone(), (index, line)) {
            warn!(
                lei = %lei,
                kept_line = line,
                dropped_line = previous_line,
                "duplicate LEI in reference file; keeping the later row"
            );
            self.report.duplicates.push(DuplicateKey {
                lei: lei.into_string(),
                kept_line: line,
                dropped_line: previous_line,
            });
        }
    }

    fn finish(mut self, fields: BTreeSet<ReferenceField>) -> (ReferenceTable, LoadReport) {
        match &mut self.store {
            RecordStore::Full(rows) => remove_vacated(rows, &self.vacated),
            RecordStore::Slim(rows) => remove_vacated(rows, &self.vacated),
        }
        self.store.shrink_to_fit();
        self.report.records = self.store.len();
        (ReferenceTable::new(self.store, fields), self.report)
    }
}

/// Stores `value` at `slot`, or appends it. Returns its index.
fn place<T>(rows: &mut Vec<T>, slot: Option<usize>, value: T) -> usize {
    match slot {
        Some(index) if index < rows.len() => {
            rows[index] = value;
            index
        }
        _ => {
            rows.push(value);
            rows.len() - 1
        }
    }
}

fn remove_vacated<T>(rows: &mut Vec<T>, vacated: &BTreeSet<usize>) {
    if vacated.is_empty() {
        return;
    }
    let mut index = 0;
    rows.retain(|_| {
        let keep = !vacated.contains(&index);
        index += 1;
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use lei_model::LoadMode;

    fn load(contents: &str, options: LoadOptions) -> Result<(ReferenceTable, LoadReport)> {
        load_reference_from_reader(contents.as_bytes(), Path::new("test.csv"), options)
    }

    const GOLDEN: &str = "\
LEI,Entity.LegalName,Entity.LegalAddress.Country,Entity.EntityStatus,Registration.RegistrationStatus,Registration.RegistrationAuthorityEntityID,Entity.OtherEntityNames.OtherEntityName.1
529900T8BM49AURSDO55,Acme Corporation Ltd,GB,ACTIVE,ISSUED,01234567,Acme
969500KSV493XWY0PS54,Société Générale Exemple SA,FR,ACTIVE,LAPSED,RCS Paris 552 120 222,
5493001KJTIIGC8Y1R12,Old Widgets GmbH,DE,INACTIVE,RETIRED,,
";

    #[test]
    fn test_full_load_keeps_every_column() {
        let (table, report) = load(GOLDEN, LoadOptions::new(LoadMode::Full)).unwrap();
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.records, 3);
        let (_, first) = table.iter().next().unwrap();
        assert_eq!(first.lei(), "529900T8BM49AURSDO55");
        assert_eq!(first.jurisdiction(), Some("GB"));
        assert_eq!(first.registry_entity_id(), Some("01234567"));
        assert_eq!(first.other_names().len(), 1);
        assert!(table.has_field(ReferenceField::OtherNames));
    }

    #[test]
    fn test_active_only_requires_active_and_issued() {
        let options = LoadOptions::new(LoadMode::Full).with_active_only(true);
        let (table, report) = load(GOLDEN, options).unwrap();
        assert_eq!(report.records, 1);
        assert_eq!(report.filtered_inactive, 2);
        assert_eq!(
            table.iter().next().unwrap().1.legal_name(),
            "Acme Corporation Ltd"
        );
    }

    #[test]
    fn test_active_only_without_registration_column_uses_entity_status() {
        let contents = "LEI,Name,Status\nA1,Acme,ACTIVE\nB2,Beta,INACTIVE\n";
        let options = LoadOptions::new(LoadMode::Slim).with_active_only(true);
        let (table, report) = load(contents, options).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(report.filtered_inactive, 1);
    }

    #[test]
    fn test_header_bom_and_case_are_ignored() {
        let contents = "\u{feff}lei,legalname\nABC,Acme\n";
        let (table, _) = load(contents, LoadOptions::new(LoadMode::Slim)).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lossy_cells_are_counted() {
        let mut bytes = b"LEI,Entity.LegalName\nABC,Caf".to_vec();
        bytes.extend_from_slice(&[0xE9, b'\n']);
        let (table, report) = load_reference_from_reader(
            bytes.as_slice(),
            Path::new("bytes.csv"),
            LoadOptions::new(LoadMode::Slim),
        )
        .unwrap();
        assert_eq!(report.lossy_rows, 1);
        assert!(
            table
                .iter()
                .next()
                .unwrap()
                .1
                .legal_name()
                .contains('\u{fffd}')
        );
    }

    #[test]
    fn test_place_replaces_existing_slot() {
        let mut rows = vec!["a", "b"];
        assert_eq!(place(&mut rows, Some(0), "c"), 0);
        assert_eq!(place(&mut rows, None, "d"), 2);
        assert_eq!(rows, ["c", "b", "d"]);
    }

    #[test]
    fn test_remove_vacated_keeps_order() {
        let mut rows = vec!["a", "b", "c", "d"];
        remove_vacated(&mut rows, &BTreeSet::from([1, 3]));
        assert_eq!(rows, ["a", "c"]);
    }
}
