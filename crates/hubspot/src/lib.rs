//! HubSpot CRM connector.
//!
//! Reads contacts, calls and deals through the v3 objects API and maps them
//! onto the shared lead/call/budget schema. Access tokens may be private-app
//! tokens or OAuth tokens; OAuth setups that also carry a refresh token and
//! client credentials get one refresh attempt when the auth check sees a 401.

pub mod connector;
pub mod normalize;
mod wire;

use std::sync::Arc;

use compass_core::config::HubSpotSettings;
use compass_core::errors::ConnectorError;
use compass_core::registry::ConnectorRegistry;
use tracing::warn;

pub use connector::{HubSpotConfig, HubSpotConnector, PLATFORM_NAME};

/// Registry key the connector is registered under.
pub const REGISTRY_NAME: &str = "hubspot";

/// Registers the HubSpot connector when an access token is configured.
/// Returns whether a connector was registered.
pub fn register_configured(
    registry: &mut ConnectorRegistry,
    settings: &HubSpotSettings,
) -> Result<bool, ConnectorError> {
    let Some(config) = HubSpotConfig::from_settings(settings) else {
        warn!(
            event_name = "connector.hubspot.not_configured",
            correlation_id = "bootstrap",
            "no hubspot access token configured; connector not registered"
        );
        return Ok(false);
    };

    registry.register(REGISTRY_NAME, Arc::new(HubSpotConnector::new(config)?));
    Ok(true)
}
