use std::path::Path;

use fairquote_core::dataset::{Column, Dataset};
use serde::Serialize;

use super::CommandResult;

const COMMAND: &str = "inspect";

#[derive(Debug, Serialize)]
struct InspectReport {
    path: String,
    rows_loaded: usize,
    rows_dropped: usize,
    content_hash: Option<String>,
    columns: Vec<ResolvedColumn>,
}

#[derive(Debug, Serialize)]
struct ResolvedColumn {
    name: &'static str,
    required: bool,
    column: Option<String>,
}

pub fn run(data: &Path, json: bool) -> CommandResult {
    let dataset = match Dataset::open(data) {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error(COMMAND, &error, json),
    };

    let report = InspectReport {
        path: data.display().to_string(),
        rows_loaded: dataset.len(),
        rows_dropped: dataset.dropped_rows(),
        content_hash: dataset.content_hash().map(str::to_string),
        columns: Column::ALL
            .iter()
            .map(|column| ResolvedColumn {
                name: column.display_name(),
                required: column.is_required(),
                column: dataset.columns().position(*column).map(column_letter),
            })
            .collect(),
    };

    if json {
        let message = format!("{} rows loaded", report.rows_loaded);
        return CommandResult::success(COMMAND, message, report);
    }

    let mut lines = vec![
        format!("dataset: {}", report.path),
        format!("rows loaded: {}", report.rows_loaded),
        format!("rows dropped: {}", report.rows_dropped),
        format!("content hash: {}", report.content_hash.as_deref().unwrap_or("<none>")),
        "columns:".to_string(),
    ];
    for column in &report.columns {
        let location = column.column.as_deref().unwrap_or("<absent>");
        lines.push(format!("- {} = {location}", column.name));
    }

    CommandResult::text(lines.join("\n"))
}

/// Zero-based column index to spreadsheet letters (`0` → `A`, `27` → `AB`).
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let offset = (remaining - 1) % 26;
        letters.push(char::from(b'A' + offset as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}
