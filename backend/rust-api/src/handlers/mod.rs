use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::services::session_service::SessionServiceError;
use crate::services::AppState;

pub mod sessions;
pub mod sse;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let json_response = json!({
            "message": message,
            "status": status.as_u16()
        });
        (status, Json(json_response)).into_response()
    }
}

impl From<SessionServiceError> for ApiError {
    fn from(err: SessionServiceError) -> Self {
        let message = err.to_string();
        match err {
            SessionServiceError::NotFound | SessionServiceError::TestNotFound(_) => {
                ApiError::NotFound(message)
            }
            SessionServiceError::InvalidTest(_) => ApiError::BadRequest(message),
            SessionServiceError::NotAvailable(_)
            | SessionServiceError::NotSubmitted
            | SessionServiceError::Session(_) => ApiError::Conflict(message),
            SessionServiceError::Catalog(e) => {
                tracing::error!(error = %format!("{:#}", e), "Test catalog failure");
                ApiError::Internal("Failed to load test".to_string())
            }
        }
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let catalog = state.sessions.catalog();
    let mut dependencies = serde_json::Map::new();

    let catalog_health = match tokio::time::timeout(
        std::time::Duration::from_secs(1),
        catalog.ping(),
    )
    .await
    {
        Ok(Ok(())) => json!({ "status": "healthy", "backend": catalog.backend() }),
        Ok(Err(e)) => json!({
            "status": "unhealthy",
            "backend": catalog.backend(),
            "error": format!("{:#}", e)
        }),
        Err(_) => json!({
            "status": "unhealthy",
            "backend": catalog.backend(),
            "error": "Catalog timeout after 1s"
        }),
    };
    let healthy = catalog_health["status"] == "healthy";
    dependencies.insert("test_catalog".to_string(), catalog_health);

    let (status, status_code) = if healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };
    let active_sessions = state.sessions.active_sessions().await;
    let retained_reports = state.sessions.retained_reports().await;

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "testwindow-api",
            "version": env!("CARGO_PKG_VERSION"),
            "active_sessions": active_sessions,
            "retained_reports": retained_reports,
            "dependencies": dependencies
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}
