//! Metrics definitions for the Media Broker.
//!
//! All metrics follow Prometheus naming conventions:
//! - `broker_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `endpoint`: parameterized paths (meeting ids replaced by `{id}`)
//! - `worker`: one value per configured worker (`worker-{ordinal}`)
//! - `operation`: the 13 session operations
//! - `status`: small fixed sets per metric

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Session actions exposed under `/meetings/{id}/{action}`.
const MEETING_ACTIONS: &[&str] = &[
    "end",
    "join",
    "leave",
    "connect",
    "produceMedia",
    "closeProducer",
    "pauseProducer",
    "resumeProducer",
    "consumeMedia",
    "pauseConsumer",
    "resumeConsumer",
];

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("broker_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Worker calls include WebRTC negotiation on the worker side
        .set_buckets_for_metric(
            Matcher::Prefix("broker_worker_call".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set worker call buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `broker_http_requests_total`, `broker_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("broker_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("broker_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/meetings/start" => return path.to_string(),
        _ => {}
    }

    let parts: Vec<&str> = path.split('/').collect();

    match parts.as_slice() {
        ["", "meetings", id] if !id.is_empty() => "/meetings/{id}".to_string(),
        ["", "meetings", id, action] if !id.is_empty() && MEETING_ACTIONS.contains(action) => {
            format!("/meetings/{{id}}/{action}")
        }
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Routing Metrics
// ============================================================================

/// Record a round-robin pick.
///
/// Metric: `broker_worker_selections_total`
/// Labels: `worker`
pub fn record_worker_selection(worker: &str) {
    counter!("broker_worker_selections_total",
        "worker" => worker.to_string()
    )
    .increment(1);
}

/// Record a forwarded worker call.
///
/// Metric: `broker_worker_calls_total`, `broker_worker_call_duration_seconds`
/// Labels: `operation`, `status` (success, error)
pub fn record_worker_call(operation: &str, status: &str, duration: Duration) {
    histogram!("broker_worker_call_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("broker_worker_calls_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record an affinity table mutation.
///
/// Metric: `broker_affinity_operations_total`
/// Labels: `operation` (bind, unbind), `status` (success, conflict, not_found)
pub fn record_affinity_operation(operation: &str, status: &str) {
    counter!("broker_affinity_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Set the number of meetings currently bound to a worker.
///
/// Metric: `broker_active_meetings`
pub fn set_active_meetings(count: usize) {
    gauge!("broker_active_meetings").set(count as f64);
}
