//! Media worker HTTP client.
//!
//! Provides the broker→worker side of every session operation. Each call
//! posts to the same path on the worker that the broker itself exposes
//! (`/meetings/start`, `/meetings/{id}/join`, ...), forwards the caller's
//! identity in the `x-username` header, and decodes the worker's
//! success/failed envelope.
//!
//! Failures surface as `WorkerError`; the routing facade converts them to
//! `BrokerError::Upstream` exactly once and never retries.

use crate::errors::BrokerError;
use crate::models::{
    ConnectTransportRequest, ConsumeMediaRequest, ConsumerRequest, MeetingId, MeetingStarted,
    ProduceMediaRequest, ProducerRequest, WorkerHandle,
};
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{instrument, warn};

/// Header carrying the caller identity toward workers.
pub const USERNAME_HEADER: &str = "x-username";

/// Session operations a worker exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerOperation {
    StartMeeting,
    EndMeeting,
    JoinMeeting,
    LeaveMeeting,
    ConnectTransport,
    ProduceMedia,
    CloseProducer,
    PauseProducer,
    ResumeProducer,
    ConsumeMedia,
    PauseConsumer,
    ResumeConsumer,
    GetMeetingInfo,
}

impl WorkerOperation {
    /// Metric/log label.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerOperation::StartMeeting => "start_meeting",
            WorkerOperation::EndMeeting => "end_meeting",
            WorkerOperation::JoinMeeting => "join_meeting",
            WorkerOperation::LeaveMeeting => "leave_meeting",
            WorkerOperation::ConnectTransport => "connect_transport",
            WorkerOperation::ProduceMedia => "produce_media",
            WorkerOperation::CloseProducer => "close_producer",
            WorkerOperation::PauseProducer => "pause_producer",
            WorkerOperation::ResumeProducer => "resume_producer",
            WorkerOperation::ConsumeMedia => "consume_media",
            WorkerOperation::PauseConsumer => "pause_consumer",
            WorkerOperation::ResumeConsumer => "resume_consumer",
            WorkerOperation::GetMeetingInfo => "get_meeting_info",
        }
    }

    /// Last path segment on the worker (empty for meeting info).
    fn path_segment(&self) -> &'static str {
        match self {
            WorkerOperation::StartMeeting => "start",
            WorkerOperation::EndMeeting => "end",
            WorkerOperation::JoinMeeting => "join",
            WorkerOperation::LeaveMeeting => "leave",
            WorkerOperation::ConnectTransport => "connect",
            WorkerOperation::ProduceMedia => "produceMedia",
            WorkerOperation::CloseProducer => "closeProducer",
            WorkerOperation::PauseProducer => "pauseProducer",
            WorkerOperation::ResumeProducer => "resumeProducer",
            WorkerOperation::ConsumeMedia => "consumeMedia",
            WorkerOperation::PauseConsumer => "pauseConsumer",
            WorkerOperation::ResumeConsumer => "resumeConsumer",
            WorkerOperation::GetMeetingInfo => "",
        }
    }
}

/// Error raised by a worker call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The worker could not be reached or answered with a server error.
    #[error("worker unavailable: {0}")]
    Unavailable(String),

    /// The worker processed the call and reported a failure.
    #[error("{0}")]
    Rejected(String),

    /// The worker answered with something that is not a valid envelope.
    #[error("invalid worker response: {0}")]
    InvalidResponse(String),

    /// The worker endpoint cannot be turned into a request URL.
    #[error("invalid worker endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<WorkerError> for BrokerError {
    fn from(err: WorkerError) -> Self {
        BrokerError::Upstream(err.to_string())
    }
}

/// Trait for worker operations (enables mocking).
#[async_trait::async_trait]
pub trait WorkerClientTrait: Send + Sync {
    /// Create a meeting on `worker` hosted by `username`.
    async fn start_meeting(
        &self,
        worker: &WorkerHandle,
        username: &str,
    ) -> Result<MeetingStarted, WorkerError>;

    /// End a meeting.
    async fn end_meeting(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
    ) -> Result<Value, WorkerError>;

    /// Add an attendee.
    async fn join_meeting(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
    ) -> Result<Value, WorkerError>;

    /// Remove an attendee.
    async fn leave_meeting(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
    ) -> Result<Value, WorkerError>;

    /// Complete the DTLS handshake of a transport.
    async fn connect_transport(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConnectTransportRequest,
    ) -> Result<Value, WorkerError>;

    /// Start producing a track.
    async fn produce_media(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProduceMediaRequest,
    ) -> Result<Value, WorkerError>;

    async fn close_producer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProducerRequest,
    ) -> Result<Value, WorkerError>;

    async fn pause_producer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProducerRequest,
    ) -> Result<Value, WorkerError>;

    async fn resume_producer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProducerRequest,
    ) -> Result<Value, WorkerError>;

    /// Start consuming another participant's producer.
    async fn consume_media(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConsumeMediaRequest,
    ) -> Result<Value, WorkerError>;

    async fn pause_consumer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConsumerRequest,
    ) -> Result<Value, WorkerError>;

    async fn resume_consumer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConsumerRequest,
    ) -> Result<Value, WorkerError>;

    /// Fetch meeting state from the worker.
    async fn get_meeting_info(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
    ) -> Result<Value, WorkerError>;
}

/// Envelope returned by workers.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum WorkerReply {
    Success {
        #[serde(default)]
        data: Value,
    },
    Failed {
        #[serde(default)]
        message: Value,
    },
}

/// Render a worker failure message, which may be a string or an error object.
fn failure_message(message: Value) -> String {
    match message {
        Value::String(text) => text,
        Value::Null => "worker reported a failure".to_string(),
        Value::Object(ref fields) => match fields.get("message") {
            Some(Value::String(text)) => text.clone(),
            _ => message.to_string(),
        },
        other => other.to_string(),
    }
}

/// HTTP client for media workers.
///
/// A single `reqwest::Client` is shared across all workers so connections
/// are pooled per host.
#[derive(Clone)]
pub struct HttpWorkerClient {
    client: Client,
}

impl HttpWorkerClient {
    /// Create a new worker client.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the HTTP client cannot be built.
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self { client })
    }

    fn url(
        &self,
        worker: &WorkerHandle,
        meeting_id: Option<&MeetingId>,
        operation: WorkerOperation,
    ) -> Result<Url, WorkerError> {
        let mut url = Url::parse(worker.endpoint())
            .map_err(|e| WorkerError::InvalidEndpoint(format!("{}: {}", worker.endpoint(), e)))?;

        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                WorkerError::InvalidEndpoint(worker.endpoint().to_string())
            })?;
            segments.pop_if_empty().push("meetings");
            if let Some(id) = meeting_id {
                segments.push(id.as_str());
            }
            let tail = operation.path_segment();
            if !tail.is_empty() {
                segments.push(tail);
            }
        }

        Ok(url)
    }

    #[instrument(
        skip(self, body),
        fields(worker = %worker.label(), operation = operation.as_str())
    )]
    async fn call<B: Serialize + Sync + ?Sized>(
        &self,
        worker: &WorkerHandle,
        method: Method,
        meeting_id: Option<&MeetingId>,
        operation: WorkerOperation,
        username: Option<&str>,
        body: Option<&B>,
    ) -> Result<Value, WorkerError> {
        let url = self.url(worker, meeting_id, operation)?;

        let mut request = self.client.request(method, url);
        if let Some(username) = username {
            request = request.header(USERNAME_HEADER, username);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(target: "broker.services.worker_client", error = %e, worker = %worker, "Worker request failed");
            WorkerError::Unavailable(format!("{} is unreachable", worker.label()))
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            warn!(target: "broker.services.worker_client", error = %e, worker = %worker, "Failed to read worker response");
            WorkerError::Unavailable(format!("{} closed the connection", worker.label()))
        })?;

        match serde_json::from_slice::<WorkerReply>(&bytes) {
            Ok(WorkerReply::Success { data }) => Ok(data),
            Ok(WorkerReply::Failed { message }) => Err(WorkerError::Rejected(failure_message(message))),
            Err(_) if status.is_server_error() => {
                warn!(target: "broker.services.worker_client", status = %status, worker = %worker, "Worker returned server error");
                Err(WorkerError::Unavailable(format!(
                    "{} returned {}",
                    worker.label(),
                    status
                )))
            }
            Err(e) => {
                warn!(target: "broker.services.worker_client", status = %status, error = %e, worker = %worker, "Unparseable worker response");
                Err(WorkerError::InvalidResponse(format!(
                    "{} returned {}: {}",
                    worker.label(),
                    status,
                    e
                )))
            }
        }
    }

    async fn post<B: Serialize + Sync + ?Sized>(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        operation: WorkerOperation,
        username: &str,
        body: Option<&B>,
    ) -> Result<Value, WorkerError> {
        self.call(
            worker,
            Method::POST,
            Some(meeting_id),
            operation,
            Some(username),
            body,
        )
        .await
    }
}

/// Placeholder body type for bodyless calls.
type NoBody = ();

#[async_trait::async_trait]
impl WorkerClientTrait for HttpWorkerClient {
    async fn start_meeting(
        &self,
        worker: &WorkerHandle,
        username: &str,
    ) -> Result<MeetingStarted, WorkerError> {
        let data = self
            .call::<NoBody>(
                worker,
                Method::POST,
                None,
                WorkerOperation::StartMeeting,
                Some(username),
                None,
            )
            .await?;

        let meeting_id = match data.get("meetingId") {
            Some(Value::String(id)) => MeetingId::new(id.clone()),
            Some(Value::Number(id)) => MeetingId::new(id.to_string()),
            _ => {
                return Err(WorkerError::InvalidResponse(format!(
                    "{} did not return a meetingId",
                    worker.label()
                )))
            }
        };

        Ok(MeetingStarted { meeting_id, data })
    }

    async fn end_meeting(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
    ) -> Result<Value, WorkerError> {
        self.post::<NoBody>(worker, meeting_id, WorkerOperation::EndMeeting, username, None)
            .await
    }

    async fn join_meeting(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
    ) -> Result<Value, WorkerError> {
        self.post::<NoBody>(worker, meeting_id, WorkerOperation::JoinMeeting, username, None)
            .await
    }

    async fn leave_meeting(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
    ) -> Result<Value, WorkerError> {
        self.post::<NoBody>(worker, meeting_id, WorkerOperation::LeaveMeeting, username, None)
            .await
    }

    async fn connect_transport(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConnectTransportRequest,
    ) -> Result<Value, WorkerError> {
        self.post(
            worker,
            meeting_id,
            WorkerOperation::ConnectTransport,
            username,
            Some(request),
        )
        .await
    }

    async fn produce_media(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProduceMediaRequest,
    ) -> Result<Value, WorkerError> {
        self.post(
            worker,
            meeting_id,
            WorkerOperation::ProduceMedia,
            username,
            Some(request),
        )
        .await
    }

    async fn close_producer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProducerRequest,
    ) -> Result<Value, WorkerError> {
        self.post(
            worker,
            meeting_id,
            WorkerOperation::CloseProducer,
            username,
            Some(request),
        )
        .await
    }

    async fn pause_producer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProducerRequest,
    ) -> Result<Value, WorkerError> {
        self.post(
            worker,
            meeting_id,
            WorkerOperation::PauseProducer,
            username,
            Some(request),
        )
        .await
    }

    async fn resume_producer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProducerRequest,
    ) -> Result<Value, WorkerError> {
        self.post(
            worker,
            meeting_id,
            WorkerOperation::ResumeProducer,
            username,
            Some(request),
        )
        .await
    }

    async fn consume_media(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConsumeMediaRequest,
    ) -> Result<Value, WorkerError> {
        self.post(
            worker,
            meeting_id,
            WorkerOperation::ConsumeMedia,
            username,
            Some(request),
        )
        .await
    }

    async fn pause_consumer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConsumerRequest,
    ) -> Result<Value, WorkerError> {
        self.post(
            worker,
            meeting_id,
            WorkerOperation::PauseConsumer,
            username,
            Some(request),
        )
        .await
    }

    async fn resume_consumer(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConsumerRequest,
    ) -> Result<Value, WorkerError> {
        self.post(
            worker,
            meeting_id,
            WorkerOperation::ResumeConsumer,
            username,
            Some(request),
        )
        .await
    }

    async fn get_meeting_info(
        &self,
        worker: &WorkerHandle,
        meeting_id: &MeetingId,
    ) -> Result<Value, WorkerError> {
        self.call::<NoBody>(
            worker,
            Method::GET,
            Some(meeting_id),
            WorkerOperation::GetMeetingInfo,
            None,
            None,
        )
        .await
    }
}

/// Mock worker client module for testing.
///
/// This module provides a mock implementation of the worker client for use
/// in unit tests and the integration test harness.
pub mod mock {

    use super::*;
    use serde_json::json;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// One recorded call against the mock.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        /// Operation invoked.
        pub operation: WorkerOperation,
        /// Ordinal of the worker the call was routed to.
        pub worker: usize,
        /// Meeting id, when the operation carries one.
        pub meeting_id: Option<MeetingId>,
    }

    /// Mock worker client.
    ///
    /// Succeeds by default. Starts mint `meeting-1`, `meeting-2`, ... unless
    /// ids are scripted. Every success payload echoes the operation and the
    /// worker label so tests can assert where a call was routed.
    #[derive(Default)]
    pub struct MockWorkerClient {
        failures: HashMap<WorkerOperation, String>,
        panics: HashSet<WorkerOperation>,
        scripted_ids: Mutex<VecDeque<String>>,
        minted: AtomicUsize,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockWorkerClient {
        /// Create a mock where every call succeeds.
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `operation` fail with `message`.
        pub fn failing(mut self, operation: WorkerOperation, message: &str) -> Self {
            self.failures.insert(operation, message.to_string());
            self
        }

        /// Make `operation` panic.
        pub fn panicking(mut self, operation: WorkerOperation) -> Self {
            self.panics.insert(operation);
            self
        }

        /// Return these meeting ids from successive starts.
        pub fn with_meeting_ids(self, ids: &[&str]) -> Self {
            Self {
                scripted_ids: Mutex::new(ids.iter().map(|id| (*id).to_string()).collect()),
                ..self
            }
        }

        /// All calls made so far, in order.
        pub async fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().await.clone()
        }

        /// Number of calls made so far.
        pub async fn call_count(&self) -> usize {
            self.calls.lock().await.len()
        }

        async fn respond(
            &self,
            operation: WorkerOperation,
            worker: &WorkerHandle,
            meeting_id: Option<&MeetingId>,
        ) -> Result<Value, WorkerError> {
            self.calls.lock().await.push(RecordedCall {
                operation,
                worker: worker.ordinal(),
                meeting_id: meeting_id.cloned(),
            });

            // Allow: simulates a collaborator that panics mid-call.
            #[allow(clippy::panic)]
            if self.panics.contains(&operation) {
                panic!("mock worker panicked during {}", operation.as_str());
            }

            if let Some(message) = self.failures.get(&operation) {
                return Err(WorkerError::Rejected(message.clone()));
            }

            Ok(json!({
                "operation": operation.as_str(),
                "worker": worker.label(),
                "meetingId": meeting_id.map(MeetingId::as_str),
            }))
        }
    }

    #[async_trait::async_trait]
    impl WorkerClientTrait for MockWorkerClient {
        async fn start_meeting(
            &self,
            worker: &WorkerHandle,
            _username: &str,
        ) -> Result<MeetingStarted, WorkerError> {
            let scripted = self.scripted_ids.lock().await.pop_front();
            let meeting_id = MeetingId::new(scripted.unwrap_or_else(|| {
                format!("meeting-{}", self.minted.fetch_add(1, Ordering::SeqCst) + 1)
            }));

            let data = self
                .respond(WorkerOperation::StartMeeting, worker, Some(&meeting_id))
                .await?;

            Ok(MeetingStarted { meeting_id, data })
        }

        async fn end_meeting(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::EndMeeting, worker, Some(meeting_id))
                .await
        }

        async fn join_meeting(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::JoinMeeting, worker, Some(meeting_id))
                .await
        }

        async fn leave_meeting(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::LeaveMeeting, worker, Some(meeting_id))
                .await
        }

        async fn connect_transport(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
            _request: &ConnectTransportRequest,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::ConnectTransport, worker, Some(meeting_id))
                .await
        }

        async fn produce_media(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
            _request: &ProduceMediaRequest,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::ProduceMedia, worker, Some(meeting_id))
                .await
        }

        async fn close_producer(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
            _request: &ProducerRequest,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::CloseProducer, worker, Some(meeting_id))
                .await
        }

        async fn pause_producer(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
            _request: &ProducerRequest,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::PauseProducer, worker, Some(meeting_id))
                .await
        }

        async fn resume_producer(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
            _request: &ProducerRequest,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::ResumeProducer, worker, Some(meeting_id))
                .await
        }

        async fn consume_media(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
            _request: &ConsumeMediaRequest,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::ConsumeMedia, worker, Some(meeting_id))
                .await
        }

        async fn pause_consumer(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
            _request: &ConsumerRequest,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::PauseConsumer, worker, Some(meeting_id))
                .await
        }

        async fn resume_consumer(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
            _username: &str,
            _request: &ConsumerRequest,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::ResumeConsumer, worker, Some(meeting_id))
                .await
        }

        async fn get_meeting_info(
            &self,
            worker: &WorkerHandle,
            meeting_id: &MeetingId,
        ) -> Result<Value, WorkerError> {
            self.respond(WorkerOperation::GetMeetingInfo, worker, Some(meeting_id))
                .await
        }
    }

}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> HttpWorkerClient {
        HttpWorkerClient::new(Duration::from_secs(1), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_worker_error_converts_to_upstream_verbatim() {
        let error: BrokerError = WorkerError::Rejected("producer not found".to_string()).into();
        assert_eq!(error, BrokerError::Upstream("producer not found".to_string()));

        let error: BrokerError = WorkerError::Unavailable("worker-0 is unreachable".to_string()).into();
        assert_eq!(
            error,
            BrokerError::Upstream("worker unavailable: worker-0 is unreachable".to_string())
        );
    }

    #[test]
    fn test_url_for_start_has_no_meeting_segment() {
        let worker = WorkerHandle::new(0, "http://worker-a:8200");
        let url = client()
            .url(&worker, None, WorkerOperation::StartMeeting)
            .unwrap();

        assert_eq!(url.as_str(), "http://worker-a:8200/meetings/start");
    }

    #[test]
    fn test_url_escapes_meeting_id_and_keeps_base_path() {
        let worker = WorkerHandle::new(0, "http://worker-a:8200/media");
        let url = client()
            .url(
                &worker,
                Some(&MeetingId::from("a b/c")),
                WorkerOperation::ProduceMedia,
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "http://worker-a:8200/media/meetings/a%20b%2Fc/produceMedia"
        );
    }

    #[test]
    fn test_url_for_meeting_info_ends_with_id() {
        let worker = WorkerHandle::new(0, "http://worker-a:8200");
        let url = client()
            .url(
                &worker,
                Some(&MeetingId::from("m1")),
                WorkerOperation::GetMeetingInfo,
            )
            .unwrap();

        assert_eq!(url.as_str(), "http://worker-a:8200/meetings/m1");
    }

    #[test]
    fn test_url_rejects_unparseable_endpoint() {
        let worker = WorkerHandle::new(0, "not a url");
        let result = client().url(&worker, None, WorkerOperation::StartMeeting);

        assert!(matches!(result, Err(WorkerError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_failure_message_shapes() {
        assert_eq!(failure_message(json!("boom")), "boom");
        assert_eq!(failure_message(json!({"message": "boom"})), "boom");
        assert_eq!(failure_message(json!({"code": 7})), "{\"code\":7}");
        assert_eq!(failure_message(Value::Null), "worker reported a failure");
    }

    #[test]
    fn test_operation_labels_are_unique() {
        let operations = [
            WorkerOperation::StartMeeting,
            WorkerOperation::EndMeeting,
            WorkerOperation::JoinMeeting,
            WorkerOperation::LeaveMeeting,
            WorkerOperation::ConnectTransport,
            WorkerOperation::ProduceMedia,
            WorkerOperation::CloseProducer,
            WorkerOperation::PauseProducer,
            WorkerOperation::ResumeProducer,
            WorkerOperation::ConsumeMedia,
            WorkerOperation::PauseConsumer,
            WorkerOperation::ResumeConsumer,
            WorkerOperation::GetMeetingInfo,
        ];

        let labels: std::collections::HashSet<_> =
            operations.iter().map(WorkerOperation::as_str).collect();
        assert_eq!(labels.len(), operations.len());
    }
}
