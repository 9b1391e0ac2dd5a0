pub mod config;
pub mod dashboard;
pub mod doctor;
pub mod sync;

use anyhow::Context;
use compass_core::config::{AppConfig, LoadOptions};
use compass_core::registry::ConnectorRegistry;
use serde::Serialize;
use tokio::runtime::Runtime;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;

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
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
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
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Everything a one-shot command needs to talk to the configured platforms.
pub(crate) struct Session {
    pub runtime: Runtime,
    pub registry: ConnectorRegistry,
    pub config: AppConfig,
}

pub(crate) enum SessionError {
    Config(String),
    Connector(String),
}

impl SessionError {
    pub fn into_result(self, command: &str) -> CommandResult {
        match self {
            Self::Config(message) => {
                CommandResult::failure(command, "config_validation", message, EXIT_CONFIG)
            }
            Self::Connector(message) => {
                CommandResult::failure(command, "connector_setup", message, EXIT_FAILURE)
            }
        }
    }
}

pub(crate) fn open_session() -> Result<Session, SessionError> {
    let config = AppConfig::load(LoadOptions::default())
        .map_err(|error| SessionError::Config(error.to_string()))?;
    let registry =
        build_registry(&config).map_err(|error| SessionError::Connector(format!("{error:#}")))?;
    let runtime = current_thread_runtime()
        .map_err(|error| SessionError::Connector(format!("{error:#}")))?;

    Ok(Session { runtime, registry, config })
}

pub(crate) fn build_registry(config: &AppConfig) -> anyhow::Result<ConnectorRegistry> {
    let mut registry = ConnectorRegistry::new();
    compass_hubspot::register_configured(&mut registry, &config.hubspot)
        .context("failed to register HubSpot connector")?;
    Ok(registry)
}

pub(crate) fn current_thread_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\
             \"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
