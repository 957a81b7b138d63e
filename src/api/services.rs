use axum::{Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use std::collections::BTreeMap;
use tracing::info;

use super::{
    error::ApiError,
    models::{HealthResponse, JobAcceptedResponse, StatusResponse},
    state::AppState,
};
use crate::jobs::JobPayload;

/// Failed jobs listed by `/status`
const STATUS_FAILED_LIMIT: usize = 50;

/// Enqueue an unzip job (POST /jobs/unzip)
///
/// Body is `{"buildId": <positive integer>, "token": "<credential>"}`.
/// Returns 202 Accepted with the job's sequence number.
pub async fn enqueue_unzip(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: JobPayload = serde_json::from_slice(&body)?;

    if payload.build_id == 0 {
        return Err(ApiError::InvalidPayload("buildId must be positive".to_string()));
    }
    if payload.token.is_empty() {
        return Err(ApiError::InvalidPayload("token must not be empty".to_string()));
    }

    let build_id = payload.build_id;
    let seq = state.broker.enqueue(payload);
    info!(seq, build_id, "Unzip job accepted");

    let response = JobAcceptedResponse {
        seq,
        queue: state.broker.queue_name().to_string(),
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Pool and queue status (GET /status)
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        queue: state.broker.queue_name().to_string(),
        depth: state.broker.depth(),
        processors: state.pool.processor_count(),
        metrics: state.metrics.snapshot(),
        failed: state.failed.list(STATUS_FAILED_LIMIT),
    })
}

/// Health check (GET /health)
///
/// Unhealthy while no processor is running (pool not started or stopped).
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();

    components.insert("api".to_string(), "healthy".to_string());
    let pool = if state.pool.processor_count() > 0 {
        "healthy"
    } else {
        "unhealthy"
    };
    components.insert("worker_pool".to_string(), pool.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let overall_status = if all_healthy { "healthy" } else { "unhealthy" };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
