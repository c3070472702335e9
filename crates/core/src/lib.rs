pub mod config;
pub mod dataset;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod highlight;
pub mod normalize;
pub mod quote;
pub mod similarity;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use dataset::{Column, ColumnMap, Dataset, DatasetCache, NormalizedDataset};
pub use domain::outcome::{ApproximateMatch, SearchOutcome};
pub use domain::record::{HistoricalRecord, NormalizedRecord, QueryInput};
pub use engine::{MatchEngine, MatchPolicy, APPROXIMATE_LIMIT, APPROXIMATE_THRESHOLD};
pub use errors::FairQuoteError;
pub use highlight::{highlight, Emphasis, HighlightMode, MarkedText, MarkedToken};
pub use normalize::{normalize, NormalizeOptions};
pub use quote::{fair_quote, FairQuote, QuoteStatistic};
pub use similarity::{ScoringMode, SimilarityScorer, TokenScorer};
