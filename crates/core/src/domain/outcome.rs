use serde::Serialize;

use crate::domain::record::HistoricalRecord;
use crate::highlight::MarkedText;
use crate::quote::FairQuote;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApproximateMatch {
    pub record: HistoricalRecord,
    pub discrepancy_score: u8,
    pub corrective_action_score: u8,
    pub combined_score: u8,
    pub discrepancy_diff: MarkedText,
    pub corrective_action_diff: MarkedText,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    /// Canonical query text the matches were computed against.
    pub query_discrepancy: String,
    pub query_corrective_action: String,
    pub exact: Vec<HistoricalRecord>,
    pub fair_quote: Option<FairQuote>,
    pub approximate: Vec<ApproximateMatch>,
}

impl SearchOutcome {
    pub fn has_exact(&self) -> bool {
        !self.exact.is_empty()
    }

    pub fn has_approximate(&self) -> bool {
        !self.approximate.is_empty()
    }
}
