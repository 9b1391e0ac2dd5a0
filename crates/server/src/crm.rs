//! CRM aggregation endpoints.
//!
//! Cross-platform routes always answer 200 with one entry per registered
//! platform; a failing platform shows up as an `error` entry beside the
//! others. Single-platform routes surface the failure as the response status.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use compass_agent::{AgentRuntime, ChatIntent};
use compass_core::config::AggregationConfig;
use compass_core::connector::{DiscardSink, FetchQuery, HealthStatus, RecordSink, SyncReport};
use compass_core::dashboard::{window_start, DashboardSummary};
use compass_core::domain::budget::BudgetSummary;
use compass_core::domain::call::Call;
use compass_core::domain::lead::Lead;
use compass_core::errors::{ApplicationError, InterfaceError};
use compass_core::registry::{ConnectorRegistry, PlatformInfo, PlatformResults};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_LIMIT: usize = 100;

#[derive(Clone)]
pub struct CrmState {
    registry: Arc<ConnectorRegistry>,
    agent: Arc<AgentRuntime>,
    sink: Arc<dyn RecordSink>,
    aggregation: AggregationConfig,
}

impl CrmState {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        agent: Arc<AgentRuntime>,
        aggregation: AggregationConfig,
    ) -> Self {
        Self { registry, agent, sink: Arc::new(DiscardSink), aggregation }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FetchParams {
    pub limit: Option<usize>,
    pub since_days: Option<i64>,
}

impl FetchParams {
    /// `limit=0` means no limit; an absent `limit` means [`DEFAULT_LIMIT`].
    fn to_query(&self, now: DateTime<Utc>) -> FetchQuery {
        let query = match self.limit.unwrap_or(DEFAULT_LIMIT) {
            0 => FetchQuery::unbounded(),
            limit => FetchQuery::limited(limit),
        };
        match self.since_days.filter(|days| *days > 0) {
            Some(days) => query.since(window_start(now, days)),
            None => query,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeadsResponse {
    pub leads: PlatformResults<Vec<Lead>>,
    pub total_platforms: usize,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CallsResponse {
    pub calls: PlatformResults<Vec<Call>>,
    pub total_platforms: usize,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub budget_info: PlatformResults<BudgetSummary>,
    pub total_platforms: usize,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub results: PlatformResults<SyncReport>,
    pub synced_at: DateTime<Utc>,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PlatformsResponse {
    pub platforms: Vec<PlatformInfo>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct PlatformLeadsResponse {
    pub platform: String,
    pub leads: Vec<Lead>,
    pub count: usize,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlatformCallsResponse {
    pub platform: String,
    pub calls: Vec<Call>,
    pub count: usize,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlatformBudgetResponse {
    pub platform: String,
    pub budget_info: BudgetSummary,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlatformSyncResponse {
    pub platform: String,
    pub result: SyncReport,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    // Accepted for client compatibility; replies are stateless.
    #[serde(default)]
    pub conversation_history: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub intent: Option<ChatIntent>,
    pub degraded: bool,
    pub timestamp: DateTime<Utc>,
    pub context_used: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
    correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            InterfaceError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message),
            InterfaceError::ServiceUnavailable { message, .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, message)
            }
            InterfaceError::Internal { message, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            detail: detail.clone(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn reject(error: impl Into<ApplicationError>, correlation_id: &str) -> ApiError {
    let error = error.into();
    warn!(
        event_name = "crm.request.failed",
        correlation_id,
        error = %error,
        "crm platform request failed"
    );
    ApiError(error.into_interface(correlation_id))
}

pub fn router(state: CrmState) -> Router {
    Router::new()
        .route("/api/crm/health", get(health))
        .route("/api/crm/leads", get(leads))
        .route("/api/crm/calls", get(calls))
        .route("/api/crm/budget", get(budget))
        .route("/api/crm/sync", post(sync))
        .route("/api/crm/dashboard", get(dashboard))
        .route("/api/crm/platforms", get(platforms))
        .route("/api/crm/platform/{name}/leads", get(platform_leads))
        .route("/api/crm/platform/{name}/calls", get(platform_calls))
        .route("/api/crm/platform/{name}/budget", get(platform_budget))
        .route("/api/crm/platform/{name}/sync", post(platform_sync))
        .route("/api/crm/chat", post(chat))
        .with_state(state)
}

async fn health(State(state): State<CrmState>) -> Json<BTreeMap<String, HealthStatus>> {
    Json(state.registry.health_check().await)
}

async fn leads(
    State(state): State<CrmState>,
    Query(params): Query<FetchParams>,
) -> Json<LeadsResponse> {
    let leads = state.registry.get_all_leads(params.to_query(Utc::now())).await;
    Json(LeadsResponse { total_platforms: leads.len(), leads, retrieved_at: Utc::now() })
}

async fn calls(
    State(state): State<CrmState>,
    Query(params): Query<FetchParams>,
) -> Json<CallsResponse> {
    let calls = state.registry.get_all_calls(params.to_query(Utc::now())).await;
    Json(CallsResponse { total_platforms: calls.len(), calls, retrieved_at: Utc::now() })
}

async fn budget(State(state): State<CrmState>) -> Json<BudgetResponse> {
    let budget_info = state.registry.get_all_budget_info(None).await;
    Json(BudgetResponse {
        total_platforms: budget_info.len(),
        budget_info,
        retrieved_at: Utc::now(),
    })
}

async fn sync(State(state): State<CrmState>) -> Json<SyncResponse> {
    let results = state.registry.sync_all(Arc::clone(&state.sink)).await;
    info!(
        event_name = "crm.sync.completed",
        correlation_id = "sync_all",
        platforms = results.len(),
        "cross-platform sync completed"
    );
    Json(SyncResponse { results, synced_at: Utc::now(), status: "completed" })
}

async fn dashboard(State(state): State<CrmState>) -> Json<DashboardSummary> {
    Json(state.registry.dashboard_summary(state.aggregation.dashboard_page_limit).await)
}

async fn platforms(State(state): State<CrmState>) -> Json<PlatformsResponse> {
    let platforms = state.registry.platforms().await;
    Json(PlatformsResponse { total: platforms.len(), platforms })
}

async fn platform_leads(
    State(state): State<CrmState>,
    Path(name): Path<String>,
    Query(params): Query<FetchParams>,
) -> Result<Json<PlatformLeadsResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let connector = state.registry.require(&name).map_err(|e| reject(e, &correlation_id))?;
    let leads = connector
        .get_leads(&params.to_query(Utc::now()))
        .await
        .map_err(|e| reject(e, &correlation_id))?;

    Ok(Json(PlatformLeadsResponse {
        platform: name,
        count: leads.len(),
        leads,
        retrieved_at: Utc::now(),
    }))
}

async fn platform_calls(
    State(state): State<CrmState>,
    Path(name): Path<String>,
    Query(params): Query<FetchParams>,
) -> Result<Json<PlatformCallsResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let connector = state.registry.require(&name).map_err(|e| reject(e, &correlation_id))?;
    let calls = connector
        .get_calls(&params.to_query(Utc::now()))
        .await
        .map_err(|e| reject(e, &correlation_id))?;

    Ok(Json(PlatformCallsResponse {
        platform: name,
        count: calls.len(),
        calls,
        retrieved_at: Utc::now(),
    }))
}

async fn platform_budget(
    State(state): State<CrmState>,
    Path(name): Path<String>,
) -> Result<Json<PlatformBudgetResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let connector = state.registry.require(&name).map_err(|e| reject(e, &correlation_id))?;
    let budget_info =
        connector.get_budget_info(None).await.map_err(|e| reject(e, &correlation_id))?;

    Ok(Json(PlatformBudgetResponse { platform: name, budget_info, retrieved_at: Utc::now() }))
}

async fn platform_sync(
    State(state): State<CrmState>,
    Path(name): Path<String>,
) -> Result<Json<PlatformSyncResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let connector = state.registry.require(&name).map_err(|e| reject(e, &correlation_id))?;
    let result =
        connector.sync(state.sink.as_ref()).await.map_err(|e| reject(e, &correlation_id))?;

    Ok(Json(PlatformSyncResponse { platform: name, result, synced_at: Utc::now() }))
}

async fn chat(
    State(state): State<CrmState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let context = state.registry.assistant_context(state.aggregation.context_page_limit).await;
    let reply = state.agent.respond(&request.message, &context);

    Json(ChatResponse {
        response: reply.response,
        intent: reply.intent,
        degraded: reply.degraded,
        timestamp: Utc::now(),
        context_used: true,
    })
}
