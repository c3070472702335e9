//! Canonical form for free-text maintenance narratives.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Remove embedded dates such as `12/05/2023` or `1-2-24`.
    pub strip_dates: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { strip_dates: true }
    }
}

fn date_pattern() -> &'static Regex {
    static DATE_PATTERN: OnceLock<Regex> = OnceLock::new();
    DATE_PATTERN.get_or_init(|| {
        Regex::new(r"\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b").expect("date pattern is a valid regex")
    })
}

/// Uppercase, strip dates (when enabled), collapse whitespace and trim.
///
/// `None` stands for a missing spreadsheet cell and yields an empty string.
pub fn normalize(text: Option<&str>, options: &NormalizeOptions) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let mut upper = text.to_uppercase();
    if options.strip_dates {
        while date_pattern().is_match(&upper) {
            upper = date_pattern().replace_all(&upper, "").into_owned();
        }
    }

    upper.split_whitespace().collect::<Vec<_>>().join(" ")
}
