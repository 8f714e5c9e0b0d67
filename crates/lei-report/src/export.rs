//! Result-table export.
//!
//! One row per query. The alternative columns repeat `max_alternatives`
//! times so every row has the same width and the file opens cleanly in a
//! spreadsheet.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use tracing::{info, info_span};

use lei_model::MatchResult;

use crate::error::{ReportError, Result};
use crate::format::OutputFormat;

/// Leading columns of every result table.
pub const BASE_COLUMNS: [&str; 14] = [
    "input_name",
    "input_registry_id",
    "input_country",
    "matched_lei",
    "matched_legal_name",
    "matched_jurisdiction",
    "matched_entity_status",
    "matched_registration_status",
    "matched_registration_authority",
    "matched_registry_id",
    "confidence",
    "classification",
    "match_method",
    "diagnostic",
];

/// Header row for a table with `max_alternatives` alternative slots.
pub fn result_header(max_alternatives: usize) -> Vec<String> {
    let mut header: Vec<String> = BASE_COLUMNS.iter().map(ToString::to_string).collect();
    for n in 1..=max_alternatives {
        header.push(format!("alt{n}_lei"));
        header.push(format!("alt{n}_name"));
        header.push(format!("alt{n}_score"));
    }
    header
}

/// Flattens one result into a row matching [`result_header`].
pub fn result_row(result: &MatchResult, max_alternatives: usize) -> Vec<String> {
    let entity = result.entity.clone().unwrap_or_default();
    let mut row = vec![
        result.input.clone(),
        result.input_registry_id.clone().unwrap_or_default(),
        result.input_country.clone().unwrap_or_default(),
        result.lei.clone().unwrap_or_default(),
        result.legal_name.clone().unwrap_or_default(),
        entity.jurisdiction.unwrap_or_default(),
        entity.entity_status.unwrap_or_default(),
        entity.registration_status.unwrap_or_default(),
        entity.registration_authority.unwrap_or_default(),
        entity.registry_id.unwrap_or_default(),
        format_score(result.confidence),
        result.classification.tag().to_string(),
        result
            .method
            .map(|method| method.as_str().to_string())
            .unwrap_or_default(),
        result.diagnostic.clone().unwrap_or_default(),
    ];
    for n in 0..max_alternatives {
        match result.alternatives.get(n) {
            Some(alt) => {
                row.push(alt.lei.clone());
                row.push(alt.legal_name.clone());
                row.push(format_score(alt.score));
            }
            None => row.extend(std::iter::repeat_n(String::new(), 3)),
        }
    }
    row
}

fn format_score(score: f64) -> String {
    format!("{score:.4}")
}

/// Writes results as CSV.
pub fn write_csv<W: Write>(writer: W, results: &[MatchResult], max_alternatives: usize) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(result_header(max_alternatives))?;
    for result in results {
        csv.write_record(result_row(result, max_alternatives))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes results as a pretty-printed JSON array.
pub fn write_json<W: Write>(mut writer: W, results: &[MatchResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writeln!(writer).map_err(serde_json::Error::io)?;
    Ok(())
}

/// Writes results to `path` in `format`.
pub fn write_results(
    path: &Path,
    results: &[MatchResult],
    format: OutputFormat,
    max_alternatives: usize,
) -> Result<()> {
    let span = info_span!("write_results", path = %path.display(), format = %format);
    let _guard = span.enter();
    let start = Instant::now();

    let io_error = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Csv => write_csv(&mut writer, results, max_alternatives)?,
        OutputFormat::Json => write_json(&mut writer, results)?,
    }
    writer.flush().map_err(io_error)?;

    info!(
        rows = results.len(),
        duration_ms = start.elapsed().as_millis(),
        "results written"
    );
    Ok(())
}
