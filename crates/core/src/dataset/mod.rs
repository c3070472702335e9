//! Historical work-order dataset: loading, eligibility and normalized snapshots.

pub mod cache;
pub mod schema;
pub mod snapshot;
pub mod xlsx;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::record::HistoricalRecord;
use crate::errors::FairQuoteError;

pub use self::cache::DatasetCache;
pub use self::schema::{Column, ColumnMap};
pub use self::snapshot::NormalizedDataset;
pub use self::xlsx::{Cell, SheetRow};

#[derive(Clone, Debug)]
pub struct Dataset {
    records: Vec<HistoricalRecord>,
    columns: ColumnMap,
    dropped_rows: usize,
    content_hash: Option<String>,
}

impl Dataset {
    /// Reads the whole file up front; the handle is closed before parsing starts.
    pub fn open(path: &Path) -> Result<Self, FairQuoteError> {
        let bytes = fs::read(path)
            .map_err(|source| FairQuoteError::Read { path: path.to_path_buf(), source })?;
        Self::from_xlsx_bytes(&bytes)
    }

    pub fn from_xlsx_bytes(bytes: &[u8]) -> Result<Self, FairQuoteError> {
        let rows = xlsx::read_first_sheet(bytes)?;
        let mut dataset = Self::from_rows(rows)?;
        dataset.content_hash = Some(content_hash(bytes));
        Ok(dataset)
    }

    /// The first non-blank row is the header row.
    pub fn from_rows(rows: Vec<SheetRow>) -> Result<Self, FairQuoteError> {
        let mut rows = rows.into_iter().skip_while(SheetRow::is_blank);
        let headers: Vec<Option<String>> = match rows.next() {
            Some(header_row) => header_row.cells.iter().map(Cell::as_text).collect(),
            None => Vec::new(),
        };
        let columns = ColumnMap::resolve(&headers)?;

        let mut records = Vec::new();
        let mut dropped_rows = 0usize;
        for row in rows {
            if row.is_blank() {
                continue;
            }
            match eligible_record(&row, &columns, records.len()) {
                Some(record) => records.push(record),
                None => {
                    debug!(
                        event_name = "dataset.row_dropped",
                        sheet_row = row.number,
                        "row is missing discrepancy, corrective action or numeric hours"
                    );
                    dropped_rows += 1;
                }
            }
        }

        info!(
            event_name = "dataset.loaded",
            rows_loaded = records.len(),
            rows_dropped = dropped_rows,
            "historical dataset loaded"
        );

        Ok(Self { records, columns, dropped_rows, content_hash: None })
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// blake3 hex digest of the source file, when loaded from bytes.
    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

fn eligible_record(
    row: &SheetRow,
    columns: &ColumnMap,
    row_index: usize,
) -> Option<HistoricalRecord> {
    let discrepancy = row.cell(columns.discrepancy).as_text()?;
    let corrective_action = row.cell(columns.corrective_action).as_text()?;
    let total_hours = hours(row.cell(columns.total_hours))?;

    let optional_text =
        |position: Option<usize>| position.and_then(|column| row.cell(column).as_text());

    Some(HistoricalRecord {
        row_index,
        sheet_row: row.number,
        discrepancy,
        corrective_action,
        total_hours,
        card_number: optional_text(columns.card_number),
        reference_number: optional_text(columns.reference_number),
        year: columns.year.and_then(|column| year(row.cell(column))),
    })
}

fn hours(cell: &Cell) -> Option<Decimal> {
    match cell {
        Cell::Number(value) => Decimal::from_f64(*value),
        Cell::Text(text) => Decimal::from_str(text.trim()).ok(),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

fn year(cell: &Cell) -> Option<i32> {
    match cell {
        Cell::Number(value) if value.fract() == 0.0 => i32::from_f64(*value),
        Cell::Text(text) => text.trim().parse::<i32>().ok(),
        _ => None,
    }
}
