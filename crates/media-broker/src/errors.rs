//! Media Broker error types.
//!
//! `BrokerError` is the single failure vocabulary at the routing core's
//! boundary. Every variant carries a message that reaches the caller
//! verbatim inside the failed envelope; the HTTP status code is a transport
//! concern layered on top via the `IntoResponse` impl.

use crate::models::MeetingId;
use crate::result::Envelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Media Broker error type.
///
/// Maps to HTTP status codes:
/// - MeetingNotFound: 404 Not Found
/// - MeetingAlreadyPresent: 409 Conflict
/// - Upstream: 502 Bad Gateway
/// - BadRequest: 400 Bad Request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// No affinity entry exists for the meeting.
    #[error("no meeting with id {0}")]
    MeetingNotFound(MeetingId),

    /// An affinity entry already exists for the meeting.
    #[error("meeting {0} already present")]
    MeetingAlreadyPresent(MeetingId),

    /// The worker collaborator failed; message is the worker's, unmodified.
    #[error("{0}")]
    Upstream(String),

    /// The inbound request could not be decoded.
    #[error("{0}")]
    BadRequest(String),
}

/// Result type used by every fallible operation of the routing core.
pub type BrokerResult<T> = Result<T, BrokerError>;

impl BrokerError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            BrokerError::MeetingNotFound(_) => 404,
            BrokerError::MeetingAlreadyPresent(_) => 409,
            BrokerError::Upstream(_) => 502,
            BrokerError::BadRequest(_) => 400,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BrokerError::MeetingNotFound(_) => "NOT_FOUND",
            BrokerError::MeetingAlreadyPresent(_) => "CONFLICT",
            BrokerError::Upstream(_) => "UPSTREAM_FAILURE",
            BrokerError::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = match &self {
            BrokerError::MeetingNotFound(_) => StatusCode::NOT_FOUND,
            BrokerError::MeetingAlreadyPresent(_) => StatusCode::CONFLICT,
            BrokerError::Upstream(message) => {
                tracing::warn!(target: "broker.upstream", error = %message, "Worker call failed");
                StatusCode::BAD_GATEWAY
            }
            BrokerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body: Envelope<()> = Envelope::Failed {
            code: Some(self.code().to_string()),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
