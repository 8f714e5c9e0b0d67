use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use lei_model::{Classification, LoadReport};

use crate::commands::{InspectOutcome, MatchOutcome};

pub fn print_match_summary(outcome: &MatchOutcome) {
    println!("Output: {} ({})", outcome.output.display(), outcome.format);
    println!("{}", load_table(&outcome.load_report));
    println!("{}", classification_table(outcome));
    if outcome.cancelled {
        eprintln!("Batch was cancelled; unstarted queries are marked Cancelled.");
    }
    println!("Elapsed: {:.2}s", outcome.elapsed.as_secs_f64());
}

pub fn print_inspect_summary(outcome: &InspectOutcome) {
    println!("Reference: {}", outcome.reference.display());
    println!(
        "Mode: {}{}",
        outcome.mode,
        if outcome.active_only { " (active only)" } else { "" }
    );
    println!("{}", load_table(&outcome.load_report));

    let mut table = Table::new();
    table.set_header(vec![header_cell("Index"), header_cell("Value")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let index = &outcome.index;
    for (label, value) in [
        ("Records", index.records),
        ("Names", index.names),
        ("Distinct tokens", index.distinct_tokens),
        ("Largest posting list", index.largest_posting),
        ("Registry ids", index.registry_ids),
    ] {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    println!("{table}");
    println!("Elapsed: {:.2}s", outcome.elapsed.as_secs_f64());
}

fn load_table(report: &LoadReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Reference"), header_cell("Rows")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Rows read"), Cell::new(report.rows_read)]);
    table.add_row(vec![
        Cell::new("Records loaded")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(report.records).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Duplicate LEIs (last kept)"),
        count_cell(report.duplicate_count(), Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Inactive filtered"),
        count_cell(report.filtered_inactive, Color::DarkGrey),
    ]);
    table.add_row(vec![
        Cell::new("Empty LEI skipped"),
        count_cell(report.skipped_empty_lei, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Rows with invalid UTF-8"),
        count_cell(report.lossy_rows, Color::Yellow),
    ]);
    table
}

fn classification_table(outcome: &MatchOutcome) -> Table {
    let stats = &outcome.stats;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Classification"),
        header_cell("Queries"),
        header_cell("Share"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for classification in Classification::ALL {
        let count = stats.count(classification);
        if count == 0 && classification == Classification::Cancelled {
            continue;
        }
        table.add_row(vec![
            classification_cell(classification),
            count_cell(count, classification_color(classification)),
            dim_cell(share(count, stats.total)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(stats.total).add_attribute(Attribute::Bold),
        Cell::new(format!("{:.1}% matched", stats.match_rate() * 100.0))
            .add_attribute(Attribute::Bold),
    ]);
    if stats.by_registry_id > 0 {
        table.add_row(vec![
            dim_cell("  via registry id"),
            dim_cell(stats.by_registry_id),
            dim_cell(share(stats.by_registry_id, stats.total)),
        ]);
    }
    table
}

fn share(count: usize, total: usize) -> String {
    if total == 0 {
        return "-".to_string();
    }
    format!("{:.1}%", count as f64 * 100.0 / total as f64)
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn classification_cell(classification: Classification) -> Cell {
    let label = match classification {
        Classification::AutoMatched => "Auto-matched",
        Classification::NeedsReview => "Needs review",
        Classification::NoMatch => "No match",
        Classification::Error => "Error",
        Classification::Cancelled => "Cancelled",
    };
    Cell::new(label).fg(classification_color(classification))
}

fn classification_color(classification: Classification) -> Color {
    match classification {
        Classification::AutoMatched => Color::Green,
        Classification::NeedsReview => Color::Yellow,
        Classification::NoMatch => Color::DarkGrey,
        Classification::Error => Color::Red,
        Classification::Cancelled => Color::Magenta,
    }
}

fn count_cell<T: ToString + PartialOrd + Default>(count: T, color: Color) -> Cell {
    if count > T::default() {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
