//! Exact and approximate matching of a query against a normalized snapshot.

use tracing::{debug, info, warn};

use crate::dataset::NormalizedDataset;
use crate::domain::outcome::{ApproximateMatch, SearchOutcome};
use crate::domain::record::QueryInput;
use crate::errors::FairQuoteError;
use crate::highlight::{highlight, HighlightMode};
use crate::normalize::normalize;
use crate::quote::{fair_quote, QuoteStatistic};
use crate::similarity::{combined_score, SimilarityScorer, TokenScorer};

pub const APPROXIMATE_THRESHOLD: u8 = 90;
pub const APPROXIMATE_LIMIT: usize = 5;

/// Qualification bounds for approximate matches. Not operator-configurable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchPolicy {
    pub min_combined_score: u8,
    pub max_results: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self { min_combined_score: APPROXIMATE_THRESHOLD, max_results: APPROXIMATE_LIMIT }
    }
}

#[derive(Clone, Debug)]
pub struct MatchEngine<S = TokenScorer> {
    policy: MatchPolicy,
    scorer: S,
    highlight_mode: HighlightMode,
    statistic: QuoteStatistic,
}

impl Default for MatchEngine<TokenScorer> {
    fn default() -> Self {
        Self::new(TokenScorer::default(), HighlightMode::default(), QuoteStatistic::default())
    }
}

impl<S: SimilarityScorer> MatchEngine<S> {
    pub fn new(scorer: S, highlight_mode: HighlightMode, statistic: QuoteStatistic) -> Self {
        Self { policy: MatchPolicy::default(), scorer, highlight_mode, statistic }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Both query fields are required; nothing is scored when either is blank.
    pub fn search(
        &self,
        snapshot: &NormalizedDataset,
        query: &QueryInput,
    ) -> Result<SearchOutcome, FairQuoteError> {
        debug!(event_name = "search.started", rows = snapshot.len(), "search started");
        if let Err(error) = validate_query(query) {
            warn!(event_name = "search.rejected", reason = %error, "search input rejected");
            return Err(error);
        }

        let options = snapshot.options();
        let query_discrepancy = normalize(Some(&query.discrepancy), options);
        let query_corrective = normalize(Some(&query.corrective_action), options);

        let exact: Vec<_> = snapshot
            .iter()
            .filter(|row| {
                row.discrepancy == query_discrepancy && row.corrective_action == query_corrective
            })
            .map(|row| row.record.clone())
            .collect();
        let exact_hours: Vec<_> = exact.iter().map(|record| record.total_hours).collect();
        let fair_quote = fair_quote(&exact_hours, self.statistic);

        let mut scored: Vec<_> = snapshot
            .iter()
            .filter_map(|row| {
                let discrepancy_score = self.scorer.score(&query_discrepancy, row.discrepancy);
                let corrective_score = self.scorer.score(&query_corrective, row.corrective_action);
                let combined = combined_score(discrepancy_score, corrective_score);
                (combined >= self.policy.min_combined_score)
                    .then_some((row, discrepancy_score, corrective_score, combined))
            })
            .collect();

        // Stable sort keeps dataset order among equal scores.
        scored.sort_by(|left, right| right.3.cmp(&left.3));
        scored.truncate(self.policy.max_results);

        let approximate: Vec<_> = scored
            .into_iter()
            .map(|(row, discrepancy_score, corrective_action_score, combined)| ApproximateMatch {
                record: row.record.clone(),
                discrepancy_score,
                corrective_action_score,
                combined_score: combined,
                discrepancy_diff: highlight(
                    &query_discrepancy,
                    row.discrepancy,
                    self.highlight_mode,
                ),
                corrective_action_diff: highlight(
                    &query_corrective,
                    row.corrective_action,
                    self.highlight_mode,
                ),
            })
            .collect();

        info!(
            event_name = "search.completed",
            rows_scanned = snapshot.len(),
            exact_matches = exact.len(),
            approximate_matches = approximate.len(),
            fair_quote_hours = fair_quote.as_ref().map(|quote| quote.quote_hours.to_string()),
            "search completed"
        );

        Ok(SearchOutcome {
            query_discrepancy,
            query_corrective_action: query_corrective,
            exact,
            fair_quote,
            approximate,
        })
    }
}

fn validate_query(query: &QueryInput) -> Result<(), FairQuoteError> {
    let missing: Vec<&str> = [
        ("discrepancy", query.discrepancy.as_str()),
        ("corrective action", query.corrective_action.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FairQuoteError::validation(format!("{} must not be empty", missing.join(" and "))))
    }
}
