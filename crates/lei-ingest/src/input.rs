//! Batch input reader.
//!
//! A batch is either a CSV file with a header row or a plain text file with
//! one entity name per line. Cells are decoded lossily: a name that was not
//! valid UTF-8 still becomes a query and is rejected later, per row.

use std::fs;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lei_model::Query;

use crate::error::InputError;

/// Column names used to build queries from a CSV batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputColumns {
    pub name: String,
    pub registry_id: Option<String>,
    pub country: Option<String>,
}

impl Default for InputColumns {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            registry_id: None,
            country: None,
        }
    }
}

/// Reads queries from `path`; `.txt` files are read one name per line.
pub fn read_queries(path: impl AsRef<Path>, columns: &InputColumns) -> Result<Vec<Query>, InputError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_text = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    let queries = if is_text {
        read_text_queries(&bytes)
    } else {
        read_csv_queries(&bytes, path, columns)?
    };
    info!(path = %path.display(), queries = queries.len(), "batch input loaded");
    Ok(queries)
}

/// One query per non-blank line.
pub fn read_text_queries(bytes: &[u8]) -> Vec<Query> {
    bytes
        .split(|byte| *byte == b'\n')
        .map(|line| String::from_utf8_lossy(line).trim().to_string())
        .filter(|line| !line.is_empty())
        .map(Query::new)
        .collect()
}

/// Queries from a CSV batch with a header row.
pub fn read_csv_queries(
    bytes: &[u8],
    path: &Path,
    columns: &InputColumns,
) -> Result<Vec<Query>, InputError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = csv
        .byte_headers()
        .map_err(|err| malformed(path, &err))?
        .iter()
        .map(|cell| {
            String::from_utf8_lossy(cell)
                .trim()
                .trim_matches('\u{feff}')
                .to_string()
        })
        .collect();

    let find = |column: &str| -> Result<usize, InputError> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(column.trim()))
            .ok_or_else(|| InputError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
                available: headers.clone(),
            })
    };
    let name_index = find(&columns.name)?;
    let registry_index = columns.registry_id.as_deref().map(find).transpose()?;
    let country_index = columns.country.as_deref().map(find).transpose()?;
    debug!(name_index, ?registry_index, ?country_index, "resolved input columns");

    let mut queries = Vec::new();
    let mut record = ByteRecord::new();
    loop {
        match csv.read_byte_record(&mut record) {
            Ok(true) => {
                let cell = |index: usize| -> String {
                    record
                        .get(index)
                        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
                        .unwrap_or_default()
                };
                let optional = |index: Option<usize>| index.map(cell).filter(|v| !v.is_empty());
                queries.push(Query {
                    name: cell(name_index),
                    registry_id: optional(registry_index),
                    country: optional(country_index),
                });
            }
            Ok(false) => break,
            Err(err) => return Err(malformed(path, &err)),
        }
    }
    Ok(queries)
}

fn malformed(path: &Path, err: &csv::Error) -> InputError {
    InputError::Malformed {
        path: path.to_path_buf(),
        line: err.position().map_or(0, csv::Position::line),
        message: err.to_string(),
    }
}
