use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::MatchEngine;
use crate::highlight::{Emphasis, HighlightMode};
use crate::normalize::NormalizeOptions;
use crate::quote::QuoteStatistic;
use crate::similarity::{ScoringMode, TokenScorer};

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["fairquote.toml", "config/fairquote.toml"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub normalize: NormalizeConfig,
    pub matching: MatchingConfig,
    pub quote: QuoteConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizeConfig {
    pub strip_dates: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchingConfig {
    pub scoring_mode: ScoringMode,
    pub highlight_mode: HighlightMode,
    pub emphasis: Emphasis,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteConfig {
    pub statistic: QuoteStatistic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub strip_dates: Option<bool>,
    pub scoring_mode: Option<ScoringMode>,
    pub highlight_mode: Option<HighlightMode>,
    pub emphasis: Option<Emphasis>,
    pub statistic: Option<QuoteStatistic>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            normalize: NormalizeConfig { strip_dates: NormalizeOptions::default().strip_dates },
            matching: MatchingConfig {
                scoring_mode: ScoringMode::default(),
                highlight_mode: HighlightMode::default(),
                emphasis: Emphasis::default(),
            },
            quote: QuoteConfig { statistic: QuoteStatistic::default() },
            logging: LoggingConfig { level: "warn".to_string(), format: LogFormat::Compact },
        }
    }
}

fn unsupported(kind: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::Validation(format!("unsupported {kind} `{value}` (expected {expected})"))
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(unsupported("log format", other, "compact|pretty|json")),
        }
    }
}

impl FromStr for ScoringMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "token_set" => Ok(Self::TokenSet),
            "token_sort" => Ok(Self::TokenSort),
            other => Err(unsupported("scoring mode", other, "token_set|token_sort")),
        }
    }
}

impl FromStr for HighlightMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "membership" => Ok(Self::Membership),
            "alignment" => Ok(Self::Alignment),
            other => Err(unsupported("highlight mode", other, "membership|alignment")),
        }
    }
}

impl FromStr for Emphasis {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "brackets" => Ok(Self::Brackets),
            "plain" => Ok(Self::Plain),
            other => Err(unsupported("emphasis", other, "html|brackets|plain")),
        }
    }
}

impl FromStr for QuoteStatistic {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "mode" => Ok(Self::Mode),
            other => Err(unsupported("quote statistic", other, "mean|mode")),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions { strip_dates: self.normalize.strip_dates }
    }

    pub fn engine(&self) -> MatchEngine<TokenScorer> {
        MatchEngine::new(
            TokenScorer::new(self.matching.scoring_mode),
            self.matching.highlight_mode,
            self.quote.statistic,
        )
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(normalize) = patch.normalize {
            if let Some(strip_dates) = normalize.strip_dates {
                self.normalize.strip_dates = strip_dates;
            }
        }

        if let Some(matching) = patch.matching {
            if let Some(scoring_mode) = matching.scoring_mode {
                self.matching.scoring_mode = scoring_mode;
            }
            if let Some(highlight_mode) = matching.highlight_mode {
                self.matching.highlight_mode = highlight_mode;
            }
            if let Some(emphasis) = matching.emphasis {
                self.matching.emphasis = emphasis;
            }
        }

        if let Some(quote) = patch.quote {
            if let Some(statistic) = quote.statistic {
                self.quote.statistic = statistic;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FAIRQUOTE_NORMALIZE_STRIP_DATES") {
            self.normalize.strip_dates = parse_bool("FAIRQUOTE_NORMALIZE_STRIP_DATES", &value)?;
        }

        if let Some(value) = read_env("FAIRQUOTE_MATCHING_SCORING_MODE") {
            self.matching.scoring_mode = value.parse()?;
        }
        if let Some(value) = read_env("FAIRQUOTE_MATCHING_HIGHLIGHT_MODE") {
            self.matching.highlight_mode = value.parse()?;
        }
        if let Some(value) = read_env("FAIRQUOTE_MATCHING_EMPHASIS") {
            self.matching.emphasis = value.parse()?;
        }

        if let Some(value) = read_env("FAIRQUOTE_QUOTE_STATISTIC") {
            self.quote.statistic = value.parse()?;
        }

        let log_level =
            read_env("FAIRQUOTE_LOGGING_LEVEL").or_else(|| read_env("FAIRQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FAIRQUOTE_LOGGING_FORMAT").or_else(|| read_env("FAIRQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(strip_dates) = overrides.strip_dates {
            self.normalize.strip_dates = strip_dates;
        }
        if let Some(scoring_mode) = overrides.scoring_mode {
            self.matching.scoring_mode = scoring_mode;
        }
        if let Some(highlight_mode) = overrides.highlight_mode {
            self.matching.highlight_mode = highlight_mode;
        }
        if let Some(emphasis) = overrides.emphasis {
            self.matching.emphasis = emphasis;
        }
        if let Some(statistic) = overrides.statistic {
            self.quote.statistic = statistic;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_logging(&self.logging)
    }
}

/// Explicit path if it exists, otherwise the first default location present.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    normalize: Option<NormalizePatch>,
    matching: Option<MatchingPatch>,
    quote: Option<QuotePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NormalizePatch {
    strip_dates: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MatchingPatch {
    scoring_mode: Option<ScoringMode>,
    highlight_mode: Option<HighlightMode>,
    emphasis: Option<Emphasis>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct QuotePatch {
    statistic: Option<QuoteStatistic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
