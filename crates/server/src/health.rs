use axum::{http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub checked_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceBanner {
    pub message: &'static str,
    pub status: &'static str,
    pub version: &'static str,
}

/// Process liveness only. Per-platform health lives under `/api/crm/health`.
pub fn router() -> Router {
    Router::new().route("/", get(root)).route("/health", get(health))
}

pub async fn root() -> Json<ServiceBanner> {
    Json(ServiceBanner {
        message: "Compass CRM aggregation service",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "healthy",
        service: "compass-server",
        checked_at: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, Json};

    use crate::health::{health, root};

    #[tokio::test]
    async fn health_reports_healthy() {
        let (status, Json(payload)) = health().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "healthy");
        assert_eq!(payload.service, "compass-server");
    }

    #[tokio::test]
    async fn root_reports_running() {
        let Json(banner) = root().await;
        assert_eq!(banner.status, "running");
        assert!(!banner.version.is_empty());
    }
}
