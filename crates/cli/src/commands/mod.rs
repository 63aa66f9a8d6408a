pub mod ask;
pub mod chat;
pub mod config;
pub mod doctor;
pub mod forecast;
pub mod kpis;
pub mod seed;

use std::sync::Arc;

use serde::Serialize;
use shelfsense_core::config::{AppConfig, LoadOptions};
use shelfsense_db::ReadOnlyStore;
use tokio::runtime::Runtime;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DATABASE: u8 = 4;
pub const EXIT_FORECAST: u8 = 5;
pub const EXIT_ASSISTANT: u8 = 6;

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
    data: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
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

/// Config, runtime and read-only store every data command starts from.
pub(crate) struct CommandContext {
    pub config: AppConfig,
    pub runtime: Runtime,
}

impl CommandContext {
    pub fn prepare(command: &str, options: LoadOptions) -> Result<Self, CommandResult> {
        let config = AppConfig::load(options).map_err(|error| {
            CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            )
        })?;

        let runtime =
            tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
                CommandResult::failure(
                    command,
                    "runtime_init",
                    format!("failed to initialize async runtime: {error}"),
                    EXIT_RUNTIME,
                )
            })?;

        Ok(Self { config, runtime })
    }

    pub async fn open_store(&self, command: &str) -> Result<Arc<ReadOnlyStore>, CommandResult> {
        ReadOnlyStore::open(&self.config.database, self.config.agent.max_result_rows)
            .await
            .map(Arc::new)
            .map_err(|error| {
                CommandResult::failure(
                    command,
                    "db_connectivity",
                    format!("failed to open `{}` read-only: {error}", self.config.database.url),
                    EXIT_DATABASE,
                )
            })
    }
}
