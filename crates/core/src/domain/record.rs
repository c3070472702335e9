use rust_decimal::Decimal;
use serde::Serialize;

/// One eligible spreadsheet row. Text fields are kept exactly as uploaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoricalRecord {
    /// Position among the eligible rows, used as the ranking tie-break.
    pub row_index: usize,
    /// 1-based row number in the source worksheet.
    pub sheet_row: u32,
    pub discrepancy: String,
    pub corrective_action: String,
    pub total_hours: Decimal,
    pub card_number: Option<String>,
    pub reference_number: Option<String>,
    pub year: Option<i32>,
}

/// Canonical view of a [`HistoricalRecord`], borrowed from a normalized snapshot.
#[derive(Clone, Copy, Debug)]
pub struct NormalizedRecord<'a> {
    pub record: &'a HistoricalRecord,
    pub discrepancy: &'a str,
    pub corrective_action: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryInput {
    pub discrepancy: String,
    pub corrective_action: String,
}

impl QueryInput {
    pub fn new(discrepancy: impl Into<String>, corrective_action: impl Into<String>) -> Self {
        Self { discrepancy: discrepancy.into(), corrective_action: corrective_action.into() }
    }
}
