pub mod config;
pub mod inspect;
pub mod search;

use fairquote_core::config::ConfigError;
use fairquote_core::errors::FairQuoteError;
use serde::Serialize;
use serde_json::Value;

pub const EXIT_OK: u8 = 0;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_VALIDATION: u8 = 3;
pub const EXIT_SCHEMA: u8 = 4;
pub const EXIT_READ: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: EXIT_OK, output: output.into() }
    }

    pub fn success(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), None, EXIT_READ)
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            detail: None,
            data: Some(data),
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        detail: Option<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            detail,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &FairQuoteError, json: bool) -> Self {
        let exit_code = exit_code_for(error);
        if json {
            return Self::failure(
                command,
                error.error_class(),
                error.user_message(),
                Some(error.to_string()),
                exit_code,
            );
        }
        Self { exit_code, output: format!("{}\n({error})", error.user_message()) }
    }

    pub fn from_config_error(command: &str, error: &ConfigError) -> Self {
        Self::failure(
            command,
            "config_validation",
            format!("config validation failed: {error}"),
            None,
            EXIT_CONFIG,
        )
    }
}

pub fn exit_code_for(error: &FairQuoteError) -> u8 {
    match error {
        FairQuoteError::Validation { .. } => EXIT_VALIDATION,
        FairQuoteError::Schema { .. } => EXIT_SCHEMA,
        FairQuoteError::Parse { .. } | FairQuoteError::Read { .. } => EXIT_READ,
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
