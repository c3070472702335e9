use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FairQuoteError {
    #[error("dataset is missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("invalid query: {message}")]
    Validation { message: String },
    #[error("could not parse workbook: {message}")]
    Parse { message: String },
    #[error("could not read dataset file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
}

impl FairQuoteError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "schema",
            Self::Validation { .. } => "validation",
            Self::Parse { .. } => "parse",
            Self::Read { .. } => "read",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Schema { missing } => format!(
                "The spreadsheet must have columns: Discrepancy, Corrective Action, and Total Hours (missing: {}).",
                missing.join(", ")
            ),
            Self::Validation { .. } => "Please enter both fields.".to_string(),
            Self::Parse { .. } | Self::Read { .. } => {
                "The uploaded file could not be read as an xlsx spreadsheet.".to_string()
            }
        }
    }
}
