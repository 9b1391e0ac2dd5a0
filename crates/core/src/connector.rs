//! The capability set every CRM platform adapter exposes.
//!
//! Connectors own their credentials and token lifecycle. Anything that goes
//! wrong inside a connector stays inside it: authentication failures degrade to
//! empty results, and the remaining faults come back as [`ConnectorError`] for
//! the registry to record against that platform only.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::budget::BudgetSummary;
use crate::domain::call::Call;
use crate::domain::lead::Lead;
use crate::errors::ConnectorError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchQuery {
    pub limit: Option<usize>,
    pub since: Option<DateTime<Utc>>,
}

impl FetchQuery {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn limited(limit: usize) -> Self {
        Self { limit: Some(limit), since: None }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn is_satisfied_by(&self, fetched: usize) -> bool {
        self.limit.map(|limit| fetched >= limit).unwrap_or(false)
    }

    /// Page size to request upstream, capped by the platform maximum.
    pub fn page_size(&self, platform_max: usize) -> usize {
        self.limit.map(|limit| limit.clamp(1, platform_max)).unwrap_or(platform_max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Leads,
    Calls,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub counts: BTreeMap<EntityKind, usize>,
    pub timestamp: DateTime<Utc>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub message: String,
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
}

impl HealthStatus {
    pub fn healthy(last_sync: Option<DateTime<Utc>>) -> Self {
        Self {
            status: HealthState::Healthy,
            message: "Connection active".to_string(),
            last_sync,
            authenticated: Some(true),
        }
    }

    pub fn unhealthy(message: impl Into<String>, last_sync: Option<DateTime<Utc>>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            message: message.into(),
            last_sync,
            authenticated: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorStatus {
    pub authenticated: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Where synced records go. Storage is somebody else's concern; connectors
/// only hand over what they fetched.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn store_leads(&self, platform: &str, leads: &[Lead]) -> Result<(), ConnectorError>;
    async fn store_calls(&self, platform: &str, calls: &[Call]) -> Result<(), ConnectorError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

#[async_trait]
impl RecordSink for DiscardSink {
    async fn store_leads(&self, _platform: &str, _leads: &[Lead]) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn store_calls(&self, _platform: &str, _calls: &[Call]) -> Result<(), ConnectorError> {
        Ok(())
    }
}

#[async_trait]
pub trait CrmConnector: Send + Sync {
    /// Human-facing platform name, e.g. `HubSpot`.
    fn platform_name(&self) -> &str;

    /// Checks the held credential. Never fails: every problem is a `false`.
    async fn authenticate(&self) -> bool;

    async fn get_leads(&self, query: &FetchQuery) -> Result<Vec<Lead>, ConnectorError>;

    async fn get_calls(&self, query: &FetchQuery) -> Result<Vec<Call>, ConnectorError>;

    async fn get_budget_info(
        &self,
        lead_ids: Option<&[String]>,
    ) -> Result<BudgetSummary, ConnectorError>;

    async fn status(&self) -> ConnectorStatus;

    async fn record_sync(&self, at: DateTime<Utc>);

    async fn sync(&self, sink: &dyn RecordSink) -> Result<SyncReport, ConnectorError> {
        let leads = self.get_leads(&FetchQuery::unbounded()).await?;
        let calls = self.get_calls(&FetchQuery::unbounded()).await?;

        sink.store_leads(self.platform_name(), &leads).await?;
        sink.store_calls(self.platform_name(), &calls).await?;

        let timestamp = Utc::now();
        self.record_sync(timestamp).await;

        let counts =
            BTreeMap::from([(EntityKind::Leads, leads.len()), (EntityKind::Calls, calls.len())]);
        Ok(SyncReport { counts, timestamp })
    }

    /// Authenticates as a side effect when the connector is not already
    /// authenticated.
    async fn health_check(&self) -> HealthStatus {
        let status = self.status().await;
        if !status.authenticated && !self.authenticate().await {
            return HealthStatus::unhealthy("Authentication failed", status.last_sync);
        }

        HealthStatus::healthy(self.status().await.last_sync)
    }
}
