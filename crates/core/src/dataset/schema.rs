use serde::Serialize;

use crate::errors::FairQuoteError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Discrepancy,
    CorrectiveAction,
    TotalHours,
    CardNumber,
    ReferenceNumber,
    Year,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Self::Discrepancy,
        Self::CorrectiveAction,
        Self::TotalHours,
        Self::CardNumber,
        Self::ReferenceNumber,
        Self::Year,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Discrepancy => "Discrepancy",
            Self::CorrectiveAction => "Corrective Action",
            Self::TotalHours => "Total Hours",
            Self::CardNumber => "Card Number",
            Self::ReferenceNumber => "Reference Number",
            Self::Year => "Year",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Discrepancy | Self::CorrectiveAction | Self::TotalHours)
    }

    /// Accepted header spellings, already in [`header_key`] form.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Discrepancy => {
                &["discrepancy", "description", "discrepancy description", "squawk"]
            }
            Self::CorrectiveAction => {
                &["corrective action", "corrective", "action taken", "corrective action taken"]
            }
            Self::TotalHours => &["total hours", "hours", "total hrs", "labor hours"],
            Self::CardNumber => &["card number", "card no", "card"],
            Self::ReferenceNumber => {
                &["reference number", "reference", "ref number", "ref no", "ref"]
            }
            Self::Year => &["year"],
        }
    }
}

/// Column positions resolved once from the header row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    pub discrepancy: usize,
    pub corrective_action: usize,
    pub total_hours: usize,
    pub card_number: Option<usize>,
    pub reference_number: Option<usize>,
    pub year: Option<usize>,
}

impl ColumnMap {
    /// Every missing required column is reported at once.
    pub fn resolve(headers: &[Option<String>]) -> Result<Self, FairQuoteError> {
        let keys: Vec<Option<String>> =
            headers.iter().map(|header| header.as_deref().map(header_key)).collect();
        let find = |column: Column| {
            keys.iter().position(|key| {
                key.as_deref().is_some_and(|key| column.aliases().contains(&key))
            })
        };

        let missing: Vec<String> = Column::ALL
            .iter()
            .filter(|column| column.is_required() && find(**column).is_none())
            .map(|column| column.display_name().to_string())
            .collect();

        match (find(Column::Discrepancy), find(Column::CorrectiveAction), find(Column::TotalHours))
        {
            (Some(discrepancy), Some(corrective_action), Some(total_hours)) => Ok(Self {
                discrepancy,
                corrective_action,
                total_hours,
                card_number: find(Column::CardNumber),
                reference_number: find(Column::ReferenceNumber),
                year: find(Column::Year),
            }),
            _ => Err(FairQuoteError::Schema { missing }),
        }
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        match column {
            Column::Discrepancy => Some(self.discrepancy),
            Column::CorrectiveAction => Some(self.corrective_action),
            Column::TotalHours => Some(self.total_hours),
            Column::CardNumber => self.card_number,
            Column::ReferenceNumber => self.reference_number,
            Column::Year => self.year,
        }
    }
}

/// Lowercase, drop `#`, `.`, `_` and `-`, collapse whitespace.
pub fn header_key(header: &str) -> String {
    header
        .chars()
        .map(|ch| if matches!(ch, '#' | '.' | '_' | '-') { ' ' } else { ch })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
