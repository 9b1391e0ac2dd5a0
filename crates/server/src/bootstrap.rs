use std::sync::Arc;

use compass_agent::{AgentRuntime, GuardrailPolicy};
use compass_core::config::{AppConfig, ConfigError, LoadOptions};
use compass_core::errors::ConnectorError;
use compass_core::registry::ConnectorRegistry;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub registry: Arc<ConnectorRegistry>,
    pub agent_runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("connector registration failed: {0}")]
    Connector(#[source] ConnectorError),
}

#[cfg_attr(not(test), allow(dead_code))]
pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let mut registry = ConnectorRegistry::new();
    compass_hubspot::register_configured(&mut registry, &config.hubspot)
        .map_err(BootstrapError::Connector)?;

    info!(
        event_name = "system.bootstrap.connectors_registered",
        correlation_id = "bootstrap",
        platforms = registry.len(),
        "crm connectors registered"
    );

    Ok(Application {
        config,
        registry: Arc::new(registry),
        agent_runtime: Arc::new(AgentRuntime::new(GuardrailPolicy::default())),
    })
}

#[cfg(test)]
mod tests {
    use compass_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    #[test]
    fn bootstrap_fails_fast_on_invalid_config() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides { port: Some(0), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        });

        let error = result.err().expect("invalid port should fail bootstrap");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("server.port"));
    }

    #[test]
    fn configured_token_registers_hubspot() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                hubspot_access_token: Some("pat-na1-test".to_string()),
                hubspot_api_base: Some("http://127.0.0.1:9".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed with a token");

        assert_eq!(app.registry.names(), vec!["hubspot".to_string()]);
        assert_eq!(app.config.hubspot.api_base, "http://127.0.0.1:9");
    }
}
