use std::sync::Arc;

use fairquote_core::dataset::{Cell, Dataset, NormalizedDataset, SheetRow};
use fairquote_core::{
    AppConfig, FairQuoteError, HighlightMode, MatchEngine, MatchPolicy, NormalizeOptions,
    QueryInput, QuoteStatistic, ScoringMode, SearchOutcome, TokenScorer, APPROXIMATE_LIMIT,
    APPROXIMATE_THRESHOLD,
};
use rust_decimal::Decimal;
use serde_json::json;

fn text(value: &str) -> Cell {
    if value.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(value.to_string())
    }
}

fn rows(data: &[(&str, &str, f64)]) -> Vec<SheetRow> {
    let mut rows = vec![SheetRow {
        number: 1,
        cells: vec![text("Discrepancy"), text("Corrective Action"), text("Total Hours")],
    }];
    for (offset, (discrepancy, corrective, hours)) in data.iter().enumerate() {
        rows.push(SheetRow {
            number: offset as u32 + 2,
            cells: vec![text(discrepancy), text(corrective), Cell::Number(*hours)],
        });
    }
    rows
}

fn snapshot(data: &[(&str, &str, f64)], options: NormalizeOptions) -> NormalizedDataset {
    let dataset = Dataset::from_rows(rows(data)).expect("dataset should load");
    NormalizedDataset::new(Arc::new(dataset), options)
}

#[test]
fn higher_threshold_never_admits_more_matches() {
    let data = snapshot(
        &[
            ("Leak at seal", "Replaced seal", 4.0),
            ("Leak at seals", "Replaced seal", 4.0),
            ("Leak at main seal", "Replaced seal", 4.0),
            ("Seal leak at door", "Replaced seal", 4.0),
            ("Oil leak", "Tightened fitting", 2.0),
        ],
        NormalizeOptions::default(),
    );
    let query = QueryInput::new("leak at seal", "replaced seal");

    let mut previous = usize::MAX;
    for threshold in [0u8, 50, 80, APPROXIMATE_THRESHOLD, 95, 100] {
        let engine = MatchEngine::<TokenScorer>::default()
            .with_policy(MatchPolicy { min_combined_score: threshold, max_results: usize::MAX });
        let outcome = engine.search(&data, &query).expect("search should succeed");

        assert!(outcome.approximate.len() <= previous, "threshold {threshold}");
        assert!(outcome.approximate.iter().all(|matched| matched.combined_score >= threshold));
        previous = outcome.approximate.len();
    }
}

#[test]
fn default_engine_caps_and_sorts_results() {
    let data: Vec<(&str, &str, f64)> = (0..12)
        .map(|index| {
            if index % 2 == 0 {
                ("Leak at seal", "Replaced seal", 4.0)
            } else {
                ("Leak at the seal", "Replaced the seal", 4.0)
            }
        })
        .collect();
    let engine: MatchEngine = MatchEngine::default();
    let outcome = engine
        .search(
            &snapshot(&data, NormalizeOptions::default()),
            &QueryInput::new("Leak at seal", "Replaced seal"),
        )
        .expect("search should succeed");

    assert_eq!(outcome.approximate.len(), APPROXIMATE_LIMIT);
    assert!(outcome
        .approximate
        .windows(2)
        .all(|pair| pair[0].combined_score >= pair[1].combined_score));
    for pair in outcome.approximate.windows(2) {
        if pair[0].combined_score == pair[1].combined_score {
            assert!(pair[0].record.row_index < pair[1].record.row_index);
        }
    }
}

#[test]
fn date_stripping_changes_exact_matching() {
    let data = [
        ("Leak found 12/05/2023", "Replaced seal", 10.0),
        ("Leak found", "Replaced seal", 20.0),
    ];
    let query = QueryInput::new("leak found", "replaced seal");
    let engine: MatchEngine = MatchEngine::default();

    let stripped = engine
        .search(&snapshot(&data, NormalizeOptions { strip_dates: true }), &query)
        .expect("search should succeed");
    assert_eq!(stripped.exact.len(), 2);
    assert_eq!(stripped.fair_quote.expect("quote").quote_hours, Decimal::from(14));

    let kept = engine
        .search(&snapshot(&data, NormalizeOptions { strip_dates: false }), &query)
        .expect("search should succeed");
    assert_eq!(kept.exact.len(), 1);
    assert_eq!(kept.fair_quote.expect("quote").quote_hours, Decimal::from(19));
}

#[test]
fn config_builds_the_configured_engine() {
    let mut config = AppConfig::default();
    config.matching.scoring_mode = ScoringMode::TokenSort;
    config.matching.highlight_mode = HighlightMode::Alignment;
    config.quote.statistic = QuoteStatistic::Mode;

    let data = snapshot(
        &[
            ("Fuzzy was a bear", "Checked", 5.0),
            ("Fuzzy fuzzy was a bear", "Checked", 7.0),
            ("Fuzzy was a bear", "Checked", 7.0),
        ],
        config.normalize_options(),
    );
    let query = QueryInput::new("fuzzy was a bear", "checked");

    let sort_outcome = config.engine().search(&data, &query).expect("search should succeed");
    let set_outcome = MatchEngine::new(
        TokenScorer::new(ScoringMode::TokenSet),
        HighlightMode::Alignment,
        QuoteStatistic::Mode,
    )
    .search(&data, &query)
    .expect("search should succeed");

    let sort_quote = sort_outcome.fair_quote.as_ref().expect("quote");
    assert_eq!(sort_quote.historical_hours, Decimal::from(5));
    let duplicated = |outcome: &SearchOutcome| {
        outcome
            .approximate
            .iter()
            .find(|matched| matched.record.row_index == 1)
            .map(|matched| matched.discrepancy_score)
    };
    assert_eq!(duplicated(&set_outcome), Some(100));
    assert!(duplicated(&sort_outcome).map_or(true, |score| score < 100));
}

#[test]
fn outcome_serializes_for_downstream_consumers() {
    let data = snapshot(
        &[
            ("Leak at seal", "Replaced seal", 40.5),
            ("Leak at seal", "Replaced seal and gasket", 3.0),
        ],
        NormalizeOptions::default(),
    );
    let engine: MatchEngine = MatchEngine::default();
    let outcome =
        engine.search(&data, &QueryInput::new("Leak at seal", "Replaced seal")).expect("search");

    let value = serde_json::to_value(&outcome).expect("outcome serializes");
    assert_eq!(value["query_discrepancy"], "LEAK AT SEAL");
    assert_eq!(value["fair_quote"]["statistic"], "mean");
    assert_eq!(value["fair_quote"]["quote_hours"], "40");
    assert_eq!(value["exact"][0]["total_hours"], "40.5");
    assert_eq!(
        value["approximate"][1]["corrective_action_diff"][2],
        json!({ "text": "AND", "different": true })
    );
}

#[test]
fn schema_is_checked_before_any_matching() {
    let header_only = vec![SheetRow {
        number: 1,
        cells: vec![text("Discrepancy"), text("Corrective Action"), text("Hours Spent")],
    }];

    let error = Dataset::from_rows(header_only).expect_err("hours column is required");
    assert!(matches!(
        error,
        FairQuoteError::Schema { ref missing } if missing == &["Total Hours".to_string()]
    ));
    assert_eq!(error.error_class(), "schema");
}
