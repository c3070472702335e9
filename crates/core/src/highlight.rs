//! Marks candidate tokens that differ from the query.
//!
//! Only the candidate side is ever marked. Query-only tokens are dropped, so the
//! output can be shown next to the user's own text.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffOp};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightMode {
    /// A candidate token is different when it appears nowhere in the query.
    #[default]
    Membership,
    /// A candidate token is different when the LCS alignment does not pair it with a
    /// query token.
    Alignment,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Html,
    #[default]
    Brackets,
    Plain,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarkedToken {
    pub text: String,
    pub different: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MarkedText {
    tokens: Vec<MarkedToken>,
}

impl MarkedText {
    pub fn tokens(&self) -> &[MarkedToken] {
        &self.tokens
    }

    pub fn different_tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter(|token| token.different).map(|token| token.text.as_str())
    }

    pub fn has_differences(&self) -> bool {
        self.tokens.iter().any(|token| token.different)
    }

    pub fn render(&self, emphasis: Emphasis) -> String {
        self.tokens
            .iter()
            .map(|token| match (token.different, emphasis) {
                (true, Emphasis::Html) => {
                    format!("<span style='color:red'>{}</span>", escape_html(&token.text))
                }
                (false, Emphasis::Html) => escape_html(&token.text),
                (true, Emphasis::Brackets) => format!("[{}]", token.text),
                _ => token.text.clone(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for MarkedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Emphasis::Brackets))
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn highlight(query: &str, candidate: &str, mode: HighlightMode) -> MarkedText {
    let tokens = match mode {
        HighlightMode::Membership => membership(query, candidate),
        HighlightMode::Alignment => alignment(query, candidate),
    };
    MarkedText { tokens }
}

fn membership(query: &str, candidate: &str) -> Vec<MarkedToken> {
    let known: HashSet<&str> = query.split_whitespace().collect();
    candidate
        .split_whitespace()
        .map(|token| MarkedToken { text: token.to_string(), different: !known.contains(token) })
        .collect()
}

fn alignment(query: &str, candidate: &str) -> Vec<MarkedToken> {
    let query_tokens: Vec<&str> = query.split_whitespace().collect();
    let candidate_tokens: Vec<&str> = candidate.split_whitespace().collect();
    let ops = similar::capture_diff_slices(Algorithm::Lcs, &query_tokens, &candidate_tokens);

    let mut marked = Vec::with_capacity(candidate_tokens.len());
    for op in ops {
        let (range, different) = match op {
            DiffOp::Equal { new_index, len, .. } => (new_index..new_index + len, false),
            DiffOp::Insert { new_index, new_len, .. }
            | DiffOp::Replace { new_index, new_len, .. } => (new_index..new_index + new_len, true),
            DiffOp::Delete { .. } => continue,
        };
        marked.extend(
            candidate_tokens[range]
                .iter()
                .map(|token| MarkedToken { text: (*token).to_string(), different }),
        );
    }
    marked
}
