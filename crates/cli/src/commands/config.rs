use std::env;
use std::fs;
use std::path::Path;

use fairquote_core::config::{resolve_config_path, AppConfig, LoadOptions};
use fairquote_core::engine::MatchPolicy;
use toml::Value;

use super::CommandResult;

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_config_error("config", &error),
    };

    let config_file_path = resolve_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    let policy = MatchPolicy::default();
    lines.push(render_line(
        "matching.threshold",
        &policy.min_combined_score.to_string(),
        "fixed".to_string(),
    ));
    lines.push(render_line("matching.limit", &policy.max_results.to_string(), "fixed".to_string()));

    CommandResult::text(lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field {
            key_path: "normalize.strip_dates",
            env_keys: &["FAIRQUOTE_NORMALIZE_STRIP_DATES"],
            value: config.normalize.strip_dates.to_string(),
        },
        Field {
            key_path: "matching.scoring_mode",
            env_keys: &["FAIRQUOTE_MATCHING_SCORING_MODE"],
            value: format!("{:?}", config.matching.scoring_mode),
        },
        Field {
            key_path: "matching.highlight_mode",
            env_keys: &["FAIRQUOTE_MATCHING_HIGHLIGHT_MODE"],
            value: format!("{:?}", config.matching.highlight_mode),
        },
        Field {
            key_path: "matching.emphasis",
            env_keys: &["FAIRQUOTE_MATCHING_EMPHASIS"],
            value: format!("{:?}", config.matching.emphasis),
        },
        Field {
            key_path: "quote.statistic",
            env_keys: &["FAIRQUOTE_QUOTE_STATISTIC"],
            value: format!("{:?}", config.quote.statistic),
        },
        Field {
            key_path: "logging.level",
            env_keys: &["FAIRQUOTE_LOGGING_LEVEL", "FAIRQUOTE_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key_path: "logging.format",
            env_keys: &["FAIRQUOTE_LOGGING_FORMAT", "FAIRQUOTE_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let set_env =
        env_keys.iter().find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = set_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
