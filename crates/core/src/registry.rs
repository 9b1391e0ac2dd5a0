//! Connector registry and cross-platform fan-out.
//!
//! Each fan-out spawns one task per registered connector. A connector that
//! errors or panics produces an error entry under its own name; every other
//! platform still reports normally and the result map always covers every
//! registered platform.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::connector::{CrmConnector, FetchQuery, HealthStatus, RecordSink, SyncReport};
use crate::context::{build_context, AssistantContext};
use crate::dashboard::{build_dashboard, DashboardSummary};
use crate::domain::budget::BudgetSummary;
use crate::domain::call::Call;
use crate::domain::lead::Lead;
use crate::errors::{ApplicationError, ConnectorError};

pub type SharedConnector = Arc<dyn CrmConnector>;
pub type PlatformResults<T> = BTreeMap<String, PlatformResult<T>>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformOutcome<T> {
    Data(T),
    Error(String),
}

/// One platform's slice of a fan-out.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlatformResult<T> {
    pub platform: String,
    pub count: usize,
    #[serde(flatten)]
    pub outcome: PlatformOutcome<T>,
}

impl<T> PlatformResult<T> {
    fn new(
        platform: String,
        result: Result<T, ConnectorError>,
        count: impl Fn(&T) -> usize,
    ) -> Self {
        match result {
            Ok(data) => {
                Self { platform, count: count(&data), outcome: PlatformOutcome::Data(data) }
            }
            Err(error) => {
                Self { platform, count: 0, outcome: PlatformOutcome::Error(error.to_string()) }
            }
        }
    }

    pub fn data(&self) -> Option<&T> {
        match &self.outcome {
            PlatformOutcome::Data(data) => Some(data),
            PlatformOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            PlatformOutcome::Data(_) => None,
            PlatformOutcome::Error(message) => Some(message),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub name: String,
    pub platform: String,
    pub authenticated: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, SharedConnector>,
    last_health_check: RwLock<Option<DateTime<Utc>>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connector` under `name`, returning whatever it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        connector: SharedConnector,
    ) -> Option<SharedConnector> {
        let name = name.into();
        info!(
            event_name = "registry.connector.registered",
            correlation_id = "bootstrap",
            platform = %name,
            "crm connector registered"
        );
        self.connectors.insert(name, connector)
    }

    pub fn get(&self, name: &str) -> Option<SharedConnector> {
        self.connectors.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<SharedConnector, ApplicationError> {
        self.get(name).ok_or_else(|| ApplicationError::PlatformNotFound(name.to_string()))
    }

    /// Registered names in stable order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connectors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub async fn last_health_check(&self) -> Option<DateTime<Utc>> {
        *self.last_health_check.read().await
    }

    pub async fn platforms(&self) -> Vec<PlatformInfo> {
        let mut platforms = Vec::with_capacity(self.connectors.len());
        for name in self.names() {
            let Some(connector) = self.connectors.get(&name) else {
                continue;
            };
            let status = connector.status().await;
            platforms.push(PlatformInfo {
                platform: connector.platform_name().to_string(),
                name,
                authenticated: status.authenticated,
                last_sync: status.last_sync,
            });
        }
        platforms
    }

    pub async fn get_all_leads(&self, query: FetchQuery) -> PlatformResults<Vec<Lead>> {
        let outcomes = self
            .fan_out("get_leads", move |connector| {
                let query = query.clone();
                async move { connector.get_leads(&query).await }
            })
            .await;
        collect(outcomes, Vec::len)
    }

    pub async fn get_all_calls(&self, query: FetchQuery) -> PlatformResults<Vec<Call>> {
        let outcomes = self
            .fan_out("get_calls", move |connector| {
                let query = query.clone();
                async move { connector.get_calls(&query).await }
            })
            .await;
        collect(outcomes, Vec::len)
    }

    pub async fn get_all_budget_info(
        &self,
        lead_ids: Option<Vec<String>>,
    ) -> PlatformResults<BudgetSummary> {
        let outcomes = self
            .fan_out("get_budget_info", move |connector| {
                let lead_ids = lead_ids.clone();
                async move { connector.get_budget_info(lead_ids.as_deref()).await }
            })
            .await;
        collect(outcomes, |summary: &BudgetSummary| summary.deal_count() as usize)
    }

    pub async fn sync_all(&self, sink: Arc<dyn RecordSink>) -> PlatformResults<SyncReport> {
        let outcomes = self
            .fan_out("sync", move |connector| {
                let sink = Arc::clone(&sink);
                async move { connector.sync(sink.as_ref()).await }
            })
            .await;
        collect(outcomes, SyncReport::total)
    }

    pub async fn health_check(&self) -> BTreeMap<String, HealthStatus> {
        let outcomes = self
            .fan_out("health_check", |connector| async move {
                Ok::<_, ConnectorError>(connector.health_check().await)
            })
            .await;

        let results = outcomes
            .into_iter()
            .map(|(name, _platform, result)| {
                let health = result.unwrap_or_else(|error| HealthStatus {
                    authenticated: Some(false),
                    ..HealthStatus::unhealthy(format!("Health check failed: {error}"), None)
                });
                (name, health)
            })
            .collect();

        *self.last_health_check.write().await = Some(Utc::now());
        results
    }

    pub async fn dashboard_summary(&self, page_limit: usize) -> DashboardSummary {
        let (leads, calls, budgets) = tokio::join!(
            self.get_all_leads(FetchQuery::limited(page_limit)),
            self.get_all_calls(FetchQuery::limited(page_limit)),
            self.get_all_budget_info(None),
        );

        build_dashboard(self.names(), &leads, &calls, &budgets, Utc::now())
    }

    pub async fn assistant_context(&self, page_limit: usize) -> AssistantContext {
        let (leads, calls, budgets, health) = tokio::join!(
            self.get_all_leads(FetchQuery::limited(page_limit)),
            self.get_all_calls(FetchQuery::limited(page_limit)),
            self.get_all_budget_info(None),
            self.health_check(),
        );

        build_context(&leads, &calls, &budgets, health, Utc::now())
    }

    async fn fan_out<T, F, Fut>(
        &self,
        operation: &'static str,
        run: F,
    ) -> Vec<(String, String, Result<T, ConnectorError>)>
    where
        F: Fn(SharedConnector) -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>> + Send + 'static,
        T: Send + 'static,
    {
        let started = Utc::now();
        let handles: Vec<_> = self
            .connectors
            .iter()
            .map(|(name, connector)| {
                let platform = connector.platform_name().to_string();
                (name.clone(), platform, tokio::spawn(run(Arc::clone(connector))))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (name, platform, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => Err(ConnectorError::Aborted(join_error.to_string())),
            };
            if let Err(error) = &result {
                warn!(
                    event_name = "registry.fanout.platform_failed",
                    correlation_id = operation,
                    platform = %name,
                    error = %error,
                    "connector operation failed; recorded against its platform only"
                );
            }
            outcomes.push((name, platform, result));
        }

        info!(
            event_name = "registry.fanout.completed",
            correlation_id = operation,
            platforms = outcomes.len(),
            elapsed_ms = (Utc::now() - started).num_milliseconds(),
            "fan-out completed"
        );
        outcomes
    }
}

fn collect<T>(
    outcomes: Vec<(String, String, Result<T, ConnectorError>)>,
    count: impl Fn(&T) -> usize,
) -> PlatformResults<T> {
    outcomes
        .into_iter()
        .map(|(name, platform, result)| (name, PlatformResult::new(platform, result, &count)))
        .collect()
}
