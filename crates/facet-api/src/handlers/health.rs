use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
}

/// Health check covering the database and the storage backend.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthCheckResponse),
        (status = 503, description = "Service unhealthy", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let mut response = HealthCheckResponse {
        status: "healthy".to_string(),
        database: "unknown".to_string(),
        storage: "unknown".to_string(),
    };

    let mut overall_healthy = true;

    match tokio::time::timeout(TIMEOUT, sqlx::query("SELECT 1").execute(&state.pool)).await {
        Ok(Ok(_)) => {
            response.database = "healthy".to_string();
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database health check failed");
            response.database = format!("unhealthy: {}", e);
            overall_healthy = false;
        }
        Err(_) => {
            tracing::error!("Database health check timed out");
            response.database = "timeout".to_string();
            overall_healthy = false;
        }
    }

    // A lightweight exists check with a non-existent key verifies storage
    // connectivity without creating objects. Storage issues degrade but do
    // not fail overall health.
    match tokio::time::timeout(
        TIMEOUT,
        state.originals.exists("health-check-non-existent-key"),
    )
    .await
    {
        Ok(Ok(_)) => {
            response.storage = "healthy".to_string();
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Storage health check warning");
            response.storage = format!("degraded: {}", e);
        }
        Err(_) => {
            tracing::warn!("Storage health check timed out");
            response.storage = "timeout".to_string();
        }
    }

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        response.status = "unhealthy".to_string();
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
