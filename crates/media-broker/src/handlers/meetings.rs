//! Meeting handlers for the Media Broker.
//!
//! Thin adapters between HTTP and the `SessionRouter`:
//!
//! - read the caller identity from the `x-username` header
//! - decode the JSON body by hand so bad input yields a 400 envelope rather
//!   than axum's plain-text 422
//! - hand the operation to the router and wrap its result in an `Envelope`
//!
//! Every response body, success or failure, is an envelope.

use crate::errors::BrokerError;
use crate::models::{
    ConnectTransportRequest, ConsumeMediaRequest, ConsumerRequest, MeetingId, ProduceMediaRequest,
    ProducerRequest,
};
use crate::result::Envelope;
use crate::routes::AppState;
use crate::services::worker_client::USERNAME_HEADER;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Response type shared by all meeting handlers.
type MeetingResponse = Result<Json<Envelope<Value>>, BrokerError>;

/// Extract the caller identity.
fn username(headers: &HeaderMap) -> Result<&str, BrokerError> {
    headers
        .get(USERNAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BrokerError::BadRequest(format!("missing {USERNAME_HEADER} header")))
}

/// Decode a JSON request body.
fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, BrokerError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "broker.handlers.meetings", error = %e, "Invalid request body");
        BrokerError::BadRequest(format!("invalid request body: {e}"))
    })
}

fn success(data: Value) -> MeetingResponse {
    Ok(Json(Envelope::Success { data }))
}

/// Handler for GET /meetings/{id}
#[instrument(skip_all, name = "broker.meeting.info", fields(meeting_id = %meeting_id))]
pub async fn get_meeting_info(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
) -> MeetingResponse {
    let meeting_id = MeetingId::new(meeting_id);
    success(state.router.get_meeting_info(&meeting_id).await?)
}

/// Handler for POST /meetings/start
///
/// # Response
///
/// - 200 OK: worker payload, including the new `meetingId`
/// - 400 Bad Request: missing `x-username`
/// - 409 Conflict: the worker returned an id that is already bound
/// - 502 Bad Gateway: the worker failed
#[instrument(skip_all, name = "broker.meeting.start")]
pub async fn start_meeting(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> MeetingResponse {
    let username = username(&headers)?;
    success(state.router.start_meeting(username).await?)
}

/// Handler for POST /meetings/{id}/end
///
/// # Response
///
/// - 200 OK: meeting ended and unbound
/// - 404 Not Found: meeting is not bound
/// - 502 Bad Gateway: the worker failed; the binding is kept
#[instrument(skip_all, name = "broker.meeting.end", fields(meeting_id = %meeting_id))]
pub async fn end_meeting(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
) -> MeetingResponse {
    let username = username(&headers)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(state.router.end_meeting(&meeting_id, username).await?)
}

/// Handler for POST /meetings/{id}/join
#[instrument(skip_all, name = "broker.meeting.join", fields(meeting_id = %meeting_id))]
pub async fn join_meeting(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
) -> MeetingResponse {
    let username = username(&headers)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(state.router.join_meeting(&meeting_id, username).await?)
}

/// Handler for POST /meetings/{id}/leave
#[instrument(skip_all, name = "broker.meeting.leave", fields(meeting_id = %meeting_id))]
pub async fn leave_meeting(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
) -> MeetingResponse {
    let username = username(&headers)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(state.router.leave_meeting(&meeting_id, username).await?)
}

/// Handler for POST /meetings/{id}/connect
#[instrument(skip_all, name = "broker.meeting.connect", fields(meeting_id = %meeting_id))]
pub async fn connect_transport(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> MeetingResponse {
    let username = username(&headers)?;
    let request: ConnectTransportRequest = decode(&body)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(
        state
            .router
            .connect_transport(&meeting_id, username, &request)
            .await?,
    )
}

/// Handler for POST /meetings/{id}/produceMedia
#[instrument(skip_all, name = "broker.meeting.produce_media", fields(meeting_id = %meeting_id))]
pub async fn produce_media(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> MeetingResponse {
    let username = username(&headers)?;
    let request: ProduceMediaRequest = decode(&body)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(
        state
            .router
            .produce_media(&meeting_id, username, &request)
            .await?,
    )
}

/// Handler for POST /meetings/{id}/closeProducer
#[instrument(skip_all, name = "broker.meeting.close_producer", fields(meeting_id = %meeting_id))]
pub async fn close_producer(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> MeetingResponse {
    let username = username(&headers)?;
    let request: ProducerRequest = decode(&body)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(
        state
            .router
            .close_producer(&meeting_id, username, &request)
            .await?,
    )
}

/// Handler for POST /meetings/{id}/pauseProducer
#[instrument(skip_all, name = "broker.meeting.pause_producer", fields(meeting_id = %meeting_id))]
pub async fn pause_producer(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> MeetingResponse {
    let username = username(&headers)?;
    let request: ProducerRequest = decode(&body)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(
        state
            .router
            .pause_producer(&meeting_id, username, &request)
            .await?,
    )
}

/// Handler for POST /meetings/{id}/resumeProducer
#[instrument(skip_all, name = "broker.meeting.resume_producer", fields(meeting_id = %meeting_id))]
pub async fn resume_producer(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> MeetingResponse {
    let username = username(&headers)?;
    let request: ProducerRequest = decode(&body)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(
        state
            .router
            .resume_producer(&meeting_id, username, &request)
            .await?,
    )
}

/// Handler for POST /meetings/{id}/consumeMedia
#[instrument(skip_all, name = "broker.meeting.consume_media", fields(meeting_id = %meeting_id))]
pub async fn consume_media(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> MeetingResponse {
    let username = username(&headers)?;
    let request: ConsumeMediaRequest = decode(&body)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(
        state
            .router
            .consume_media(&meeting_id, username, &request)
            .await?,
    )
}

/// Handler for POST /meetings/{id}/pauseConsumer
#[instrument(skip_all, name = "broker.meeting.pause_consumer", fields(meeting_id = %meeting_id))]
pub async fn pause_consumer(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> MeetingResponse {
    let username = username(&headers)?;
    let request: ConsumerRequest = decode(&body)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(
        state
            .router
            .pause_consumer(&meeting_id, username, &request)
            .await?,
    )
}

/// Handler for POST /meetings/{id}/resumeConsumer
#[instrument(skip_all, name = "broker.meeting.resume_consumer", fields(meeting_id = %meeting_id))]
pub async fn resume_consumer(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> MeetingResponse {
    let username = username(&headers)?;
    let request: ConsumerRequest = decode(&body)?;
    let meeting_id = MeetingId::new(meeting_id);
    success(
        state
            .router
            .resume_consumer(&meeting_id, username, &request)
            .await?,
    )
}
