//! Order-insensitive token similarity on a 0-100 scale.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use similar::TextDiff;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Compares deduplicated token sets; repeated words do not lower the score.
    #[default]
    TokenSet,
    /// Compares sorted token sequences; repeated words count.
    TokenSort,
}

pub trait SimilarityScorer {
    fn score(&self, left: &str, right: &str) -> u8;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokenScorer {
    mode: ScoringMode,
}

impl TokenScorer {
    pub fn new(mode: ScoringMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }
}

impl SimilarityScorer for TokenScorer {
    fn score(&self, left: &str, right: &str) -> u8 {
        match self.mode {
            ScoringMode::TokenSet => token_set_ratio(left, right),
            ScoringMode::TokenSort => token_sort_ratio(left, right),
        }
    }
}

/// Mean of the two per-field scores, truncated.
pub fn combined_score(discrepancy: u8, corrective_action: u8) -> u8 {
    ((u16::from(discrepancy) + u16::from(corrective_action)) / 2) as u8
}

pub fn token_set_ratio(left: &str, right: &str) -> u8 {
    let left_tokens: BTreeSet<String> = tokens(left).collect();
    let right_tokens: BTreeSet<String> = tokens(right).collect();

    if let Some(score) = empty_score(left_tokens.is_empty(), right_tokens.is_empty()) {
        return score;
    }

    let shared = join(left_tokens.intersection(&right_tokens));
    let left_only = join(left_tokens.difference(&right_tokens));
    let right_only = join(right_tokens.difference(&left_tokens));

    let left_combined = concat(&shared, &left_only);
    let right_combined = concat(&shared, &right_only);

    ratio(&shared, &left_combined)
        .max(ratio(&shared, &right_combined))
        .max(ratio(&left_combined, &right_combined))
}

pub fn token_sort_ratio(left: &str, right: &str) -> u8 {
    let mut left_tokens: Vec<String> = tokens(left).collect();
    let mut right_tokens: Vec<String> = tokens(right).collect();

    if let Some(score) = empty_score(left_tokens.is_empty(), right_tokens.is_empty()) {
        return score;
    }

    left_tokens.sort_unstable();
    right_tokens.sort_unstable();
    ratio(&left_tokens.join(" "), &right_tokens.join(" "))
}

/// Character-level matching ratio `2·M / (|a| + |b|)` scaled to 0-100.
pub fn ratio(left: &str, right: &str) -> u8 {
    let diff = TextDiff::from_chars(left, right);
    (f64::from(diff.ratio()) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn empty_score(left_empty: bool, right_empty: bool) -> Option<u8> {
    match (left_empty, right_empty) {
        (true, true) => Some(100),
        (true, false) | (false, true) => Some(0),
        (false, false) => None,
    }
}

/// Punctuation separates tokens; case never matters.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_uppercase)
}

fn join<'a>(tokens: impl Iterator<Item = &'a String>) -> String {
    tokens.map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn concat(shared: &str, rest: &str) -> String {
    format!("{shared} {rest}").trim().to_string()
}
