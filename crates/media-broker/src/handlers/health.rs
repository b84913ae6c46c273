//! Health check handler.
//!
//! `/health` reports liveness plus the current meeting spread over the
//! worker pool. It never contacts a worker.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /health
#[tracing::instrument(skip_all, name = "broker.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let workers = state.router.worker_status().await;
    let active_meetings = workers.iter().map(|w| w.active_meetings).sum();

    Json(HealthResponse {
        status: "healthy".to_string(),
        active_meetings,
        pool_size: state.router.pool_size(),
        workers,
    })
}
