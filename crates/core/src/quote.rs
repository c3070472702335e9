use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatistic {
    /// Arithmetic mean of the exact-match hours.
    #[default]
    Mean,
    /// Most frequent hours value; ties go to the smallest value.
    Mode,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FairQuote {
    pub statistic: QuoteStatistic,
    /// Historical hours before the shrink factor.
    pub historical_hours: Decimal,
    /// `historical_hours * 0.99`, truncated toward zero.
    pub quote_hours: Decimal,
    pub sample_size: usize,
}

/// Discount applied to historical hours before quoting.
pub fn shrink_factor() -> Decimal {
    Decimal::new(99, 2)
}

/// Returns `None` when there are no hours to derive a quote from, or when the hours
/// are out of `Decimal` range.
pub fn fair_quote(hours: &[Decimal], statistic: QuoteStatistic) -> Option<FairQuote> {
    let historical_hours = match statistic {
        QuoteStatistic::Mean => mean(hours)?,
        QuoteStatistic::Mode => mode(hours)?,
    };

    Some(FairQuote {
        statistic,
        historical_hours,
        quote_hours: historical_hours.checked_mul(shrink_factor())?.trunc().normalize(),
        sample_size: hours.len(),
    })
}

fn mean(hours: &[Decimal]) -> Option<Decimal> {
    if hours.is_empty() {
        return None;
    }
    let count = Decimal::from(hours.len());
    match hours.iter().try_fold(Decimal::ZERO, |total, value| total.checked_add(*value)) {
        Some(total) => total.checked_div(count),
        // A total past `Decimal::MAX` is averaged term by term instead.
        None => hours
            .iter()
            .try_fold(Decimal::ZERO, |total, value| total.checked_add(value.checked_div(count)?)),
    }
}

fn mode(hours: &[Decimal]) -> Option<Decimal> {
    let mut counts: BTreeMap<Decimal, usize> = BTreeMap::new();
    for value in hours {
        *counts.entry(value.normalize()).or_default() += 1;
    }

    let mut best: Option<(Decimal, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}
