use std::path::Path;
use std::sync::Arc;

use fairquote_core::config::AppConfig;
use fairquote_core::dataset::{Dataset, NormalizedDataset};
use fairquote_core::domain::outcome::{ApproximateMatch, SearchOutcome};
use fairquote_core::domain::record::{HistoricalRecord, QueryInput};
use fairquote_core::highlight::Emphasis;
use serde::Serialize;

use super::CommandResult;

const COMMAND: &str = "search";

#[derive(Debug, Serialize)]
struct SearchReport<'a> {
    emphasis: Emphasis,
    #[serde(flatten)]
    outcome: &'a SearchOutcome,
    rendered: Vec<RenderedMatch>,
}

#[derive(Debug, Serialize)]
struct RenderedMatch {
    discrepancy: String,
    corrective_action: String,
}

pub fn run(
    config: &AppConfig,
    data: &Path,
    discrepancy: &str,
    corrective_action: &str,
    json: bool,
) -> CommandResult {
    let dataset = match Dataset::open(data) {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error(COMMAND, &error, json),
    };
    let snapshot = NormalizedDataset::new(Arc::new(dataset), config.normalize_options());
    let query = QueryInput::new(discrepancy, corrective_action);

    let outcome = match config.engine().search(&snapshot, &query) {
        Ok(outcome) => outcome,
        Err(error) => return CommandResult::from_error(COMMAND, &error, json),
    };

    let emphasis = config.matching.emphasis;
    if json {
        let rendered = outcome
            .approximate
            .iter()
            .map(|matched| RenderedMatch {
                discrepancy: matched.discrepancy_diff.render(emphasis),
                corrective_action: matched.corrective_action_diff.render(emphasis),
            })
            .collect();
        let report = SearchReport { emphasis, outcome: &outcome, rendered };
        let message = format!(
            "{} exact, {} approximate matches",
            outcome.exact.len(),
            outcome.approximate.len()
        );
        return CommandResult::success(COMMAND, message, report);
    }

    CommandResult::text(render_text(&outcome, emphasis))
}

pub fn render_text(outcome: &SearchOutcome, emphasis: Emphasis) -> String {
    let mut lines = vec![format!(
        "query: {} / {}",
        outcome.query_discrepancy, outcome.query_corrective_action
    )];

    lines.push(String::new());
    if outcome.has_exact() {
        lines.push(format!("Exact matches ({}):", outcome.exact.len()));
        for record in &outcome.exact {
            lines.push(format!("  - {}", record_summary(record)));
            lines.push(format!("    Discrepancy: {}", record.discrepancy));
            lines.push(format!("    Corrective Action: {}", record.corrective_action));
        }
    } else {
        lines.push("No exact match found.".to_string());
    }

    if let Some(quote) = &outcome.fair_quote {
        lines.push(format!(
            "Historical {:?} hours: {} | Fair Quote: {} hours",
            quote.statistic,
            quote.historical_hours.round_dp(2),
            quote.quote_hours
        ));
    }

    lines.push(String::new());
    if outcome.has_approximate() {
        lines.push(format!("Approximate matches ({}):", outcome.approximate.len()));
        for (rank, matched) in outcome.approximate.iter().enumerate() {
            lines.extend(approximate_lines(rank + 1, matched, emphasis));
        }
    } else {
        lines.push("No close matches found.".to_string());
    }

    lines.join("\n")
}

fn approximate_lines(rank: usize, matched: &ApproximateMatch, emphasis: Emphasis) -> Vec<String> {
    vec![
        format!(
            "  {rank}. score {} (discrepancy {}, corrective action {}) | {}",
            matched.combined_score,
            matched.discrepancy_score,
            matched.corrective_action_score,
            record_summary(&matched.record)
        ),
        format!("     Discrepancy: {}", matched.discrepancy_diff.render(emphasis)),
        format!("     Corrective Action: {}", matched.corrective_action_diff.render(emphasis)),
    ]
}

fn record_summary(record: &HistoricalRecord) -> String {
    let mut parts = vec![format!("row {}", record.sheet_row)];
    if let Some(card) = &record.card_number {
        parts.push(format!("card {card}"));
    }
    if let Some(reference) = &record.reference_number {
        parts.push(format!("ref {reference}"));
    }
    if let Some(year) = record.year {
        parts.push(format!("year {year}"));
    }
    parts.push(format!("{} hours", record.total_hours));
    parts.join(" | ")
}
