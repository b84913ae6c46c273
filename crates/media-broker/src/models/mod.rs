//! Media Broker models.
//!
//! Contains data types shared by the routing core, the worker client and
//! the HTTP transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Opaque meeting identifier.
///
/// Either returned by a worker when a meeting is started or supplied in the
/// request path for every later operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingId(String);

impl MeetingId {
    /// Create a meeting id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MeetingId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for MeetingId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, PartialEq, Eq)]
struct WorkerEndpoint {
    ordinal: usize,
    endpoint: String,
}

/// Reference to one backend media worker.
///
/// Handles are created once when the pool is built and cloned (cheaply, via
/// `Arc`) into affinity entries. Two handles are equal when they refer to the
/// same pool slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    inner: Arc<WorkerEndpoint>,
}

impl WorkerHandle {
    /// Create a handle for the worker at `ordinal` in the pool.
    pub fn new(ordinal: usize, endpoint: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(WorkerEndpoint {
                ordinal,
                endpoint: endpoint.into(),
            }),
        }
    }

    /// Position of this worker in the configured pool.
    pub fn ordinal(&self) -> usize {
        self.inner.ordinal
    }

    /// Base URL of the worker.
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Bounded-cardinality label used for metrics and logs.
    pub fn label(&self) -> String {
        format!("worker-{}", self.inner.ordinal)
    }
}

impl fmt::Display for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.inner.endpoint)
    }
}

/// Outcome of a successful meeting start on a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingStarted {
    /// Id the worker assigned to the new meeting.
    pub meeting_id: MeetingId,

    /// Full payload returned by the worker, forwarded to the caller as-is.
    pub data: Value,
}

// ============================================================================
// Session operation payloads
// ============================================================================

/// Body of `POST /meetings/{id}/connect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectTransportRequest {
    /// Which transport is being connected ("producer" or "consumer").
    pub transport_type: String,

    /// DTLS parameters negotiated by the client.
    pub dtls_parameters: Value,
}

/// Body of `POST /meetings/{id}/produceMedia`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceMediaRequest {
    /// Application data attached to the producer.
    #[serde(default)]
    pub app_data: Value,

    /// RTP parameters of the produced track.
    pub rtp_parameters: Value,
}

/// Body of the close/pause/resume producer operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerRequest {
    /// Kind of producer (e.g. "audio", "video", "screen").
    pub producer_type: String,
}

/// Body of `POST /meetings/{id}/consumeMedia`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeMediaRequest {
    /// Producer to consume from.
    pub producer_id: String,

    /// RTP capabilities of the consuming client.
    pub rtp_capabilities: Value,
}

/// Body of the pause/resume consumer operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerRequest {
    /// Consumer being paused or resumed.
    pub consumer_id: String,
}

// ============================================================================
// Health
// ============================================================================

/// Number of active meetings bound to one worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerStatus {
    /// Worker label (`worker-{ordinal}`).
    pub worker: String,

    /// Worker base URL.
    pub endpoint: String,

    /// Meetings currently bound to this worker.
    pub active_meetings: usize,
}

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status.
    pub status: String,

    /// Total number of active meetings.
    pub active_meetings: usize,

    /// Number of workers in the pool.
    pub pool_size: usize,

    /// Per-worker breakdown in pool order.
    pub workers: Vec<WorkerStatus>,
}
