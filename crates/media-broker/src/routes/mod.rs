//! HTTP routes for the Media Broker.
//!
//! Defines the Axum router and application state.

use crate::config::HTTP_REQUEST_TIMEOUT_SECONDS;
use crate::handlers;
use crate::middleware::{error_envelope_middleware, http_metrics_middleware};
use crate::services::SessionRouter;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Routing facade over the worker pool.
    pub router: Arc<SessionRouter>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - liveness plus per-worker meeting counts
/// - `/metrics` - Prometheus metrics endpoint
/// - `/meetings/start` and `/meetings/{id}[/{action}]` - session operations
/// - TraceLayer for request logging
/// - Failed envelopes for unknown routes, wrong methods and timeouts
/// - HTTP metrics middleware
/// - Request timeout of `HTTP_REQUEST_TIMEOUT_SECONDS`
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let meeting_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/meetings/start", post(handlers::start_meeting))
        .route("/meetings/:meeting_id", get(handlers::get_meeting_info))
        .route("/meetings/:meeting_id/end", post(handlers::end_meeting))
        .route("/meetings/:meeting_id/join", post(handlers::join_meeting))
        .route("/meetings/:meeting_id/leave", post(handlers::leave_meeting))
        .route(
            "/meetings/:meeting_id/connect",
            post(handlers::connect_transport),
        )
        .route(
            "/meetings/:meeting_id/produceMedia",
            post(handlers::produce_media),
        )
        .route(
            "/meetings/:meeting_id/closeProducer",
            post(handlers::close_producer),
        )
        .route(
            "/meetings/:meeting_id/pauseProducer",
            post(handlers::pause_producer),
        )
        .route(
            "/meetings/:meeting_id/resumeProducer",
            post(handlers::resume_producer),
        )
        .route(
            "/meetings/:meeting_id/consumeMedia",
            post(handlers::consume_media),
        )
        .route(
            "/meetings/:meeting_id/pauseConsumer",
            post(handlers::pause_consumer),
        )
        .route(
            "/meetings/:meeting_id/resumeConsumer",
            post(handlers::resume_consumer),
        )
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. error_envelope_middleware - Envelope framework errors
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    meeting_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(
            HTTP_REQUEST_TIMEOUT_SECONDS,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(error_envelope_middleware))
        .layer(middleware::from_fn(http_metrics_middleware))
}
