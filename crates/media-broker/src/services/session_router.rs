//! Session Routing Service.
//!
//! Composes worker selection, the affinity table and the worker client into
//! the per-meeting session lifecycle.
//!
//! # Lifecycle
//!
//! ```text
//! Unbound --start (worker ok, bind ok)--> Bound
//! Bound   --end   (worker ok, unbind ok)--> Unbound
//! Bound   --join/leave/connect/produce/consume/...--> Bound
//! ```
//!
//! - A meeting is bound only after its worker accepted the start; a failed
//!   start leaves nothing behind.
//! - A meeting is unbound only after its worker accepted the end; a failed
//!   end keeps the binding so the caller can retry.
//! - Every other operation requires a binding; an unknown meeting fails
//!   before any worker is contacted.
//!
//! Worker errors and panics are folded into `BrokerError::Upstream` here and
//! nowhere else.

use crate::errors::BrokerResult;
use crate::models::{
    ConnectTransportRequest, ConsumeMediaRequest, ConsumerRequest, MeetingId, ProduceMediaRequest,
    ProducerRequest, WorkerHandle, WorkerStatus,
};
use crate::observability::metrics;
use crate::repositories::MeetingAffinityRepository;
use crate::result::wrap_async;
use crate::services::worker_client::{WorkerClientTrait, WorkerError, WorkerOperation};
use crate::services::worker_selection::WorkerSelector;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Routing facade for session operations.
///
/// Constructed once at startup and shared through the HTTP state; tests
/// build independent instances.
pub struct SessionRouter {
    selector: WorkerSelector,
    affinity: MeetingAffinityRepository,
    worker_client: Arc<dyn WorkerClientTrait>,
}

impl SessionRouter {
    /// Create a router with an empty affinity table.
    pub fn new(selector: WorkerSelector, worker_client: Arc<dyn WorkerClientTrait>) -> Self {
        Self {
            selector,
            affinity: MeetingAffinityRepository::new(),
            worker_client,
        }
    }

    /// The affinity table backing this router.
    pub fn affinity(&self) -> &MeetingAffinityRepository {
        &self.affinity
    }

    /// Number of workers meetings are spread over.
    pub fn pool_size(&self) -> usize {
        self.selector.pool_size()
    }

    /// Active meeting count per worker, in pool order.
    pub async fn worker_status(&self) -> Vec<WorkerStatus> {
        let counts = self.affinity.meetings_per_worker().await;
        self.selector
            .workers()
            .iter()
            .map(|worker| WorkerStatus {
                worker: worker.label(),
                endpoint: worker.endpoint().to_string(),
                active_meetings: counts.get(&worker.ordinal()).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Start a meeting on the next worker in round-robin order.
    ///
    /// Returns the worker's payload (which includes `meetingId`).
    ///
    /// # Errors
    ///
    /// - `BrokerError::Upstream` - the worker failed; no binding is created
    /// - `BrokerError::MeetingAlreadyPresent` - the worker returned an id that
    ///   is already bound
    #[instrument(skip_all)]
    pub async fn start_meeting(&self, username: &str) -> BrokerResult<Value> {
        let worker = self.selector.pick_worker();

        let started = self
            .forward(
                WorkerOperation::StartMeeting,
                &worker,
                self.worker_client.start_meeting(&worker, username),
            )
            .await?;

        if let Err(e) = self
            .affinity
            .bind(started.meeting_id.clone(), worker.clone())
            .await
        {
            warn!(
                target: "broker.services.session_router",
                meeting_id = %started.meeting_id,
                worker = %worker,
                "Worker started a meeting whose id is already bound"
            );
            return Err(e);
        }

        info!(
            target: "broker.services.session_router",
            meeting_id = %started.meeting_id,
            worker = %worker,
            "Meeting started"
        );

        Ok(started.data)
    }

    /// End a meeting on its bound worker and release the binding.
    ///
    /// # Errors
    ///
    /// - `BrokerError::MeetingNotFound` - the meeting is not bound
    /// - `BrokerError::Upstream` - the worker failed; the binding is kept
    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn end_meeting(&self, meeting_id: &MeetingId, username: &str) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;

        let data = self
            .forward(
                WorkerOperation::EndMeeting,
                &worker,
                self.worker_client.end_meeting(&worker, meeting_id, username),
            )
            .await?;

        self.affinity.unbind(meeting_id).await?;

        info!(
            target: "broker.services.session_router",
            meeting_id = %meeting_id,
            worker = %worker,
            "Meeting ended"
        );

        Ok(data)
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn join_meeting(&self, meeting_id: &MeetingId, username: &str) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::JoinMeeting,
            &worker,
            self.worker_client.join_meeting(&worker, meeting_id, username),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn leave_meeting(
        &self,
        meeting_id: &MeetingId,
        username: &str,
    ) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::LeaveMeeting,
            &worker,
            self.worker_client.leave_meeting(&worker, meeting_id, username),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn connect_transport(
        &self,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConnectTransportRequest,
    ) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::ConnectTransport,
            &worker,
            self.worker_client
                .connect_transport(&worker, meeting_id, username, request),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn produce_media(
        &self,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProduceMediaRequest,
    ) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::ProduceMedia,
            &worker,
            self.worker_client
                .produce_media(&worker, meeting_id, username, request),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn close_producer(
        &self,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProducerRequest,
    ) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::CloseProducer,
            &worker,
            self.worker_client
                .close_producer(&worker, meeting_id, username, request),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn pause_producer(
        &self,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProducerRequest,
    ) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::PauseProducer,
            &worker,
            self.worker_client
                .pause_producer(&worker, meeting_id, username, request),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn resume_producer(
        &self,
        meeting_id: &MeetingId,
        username: &str,
        request: &ProducerRequest,
    ) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::ResumeProducer,
            &worker,
            self.worker_client
                .resume_producer(&worker, meeting_id, username, request),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn consume_media(
        &self,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConsumeMediaRequest,
    ) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::ConsumeMedia,
            &worker,
            self.worker_client
                .consume_media(&worker, meeting_id, username, request),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn pause_consumer(
        &self,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConsumerRequest,
    ) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::PauseConsumer,
            &worker,
            self.worker_client
                .pause_consumer(&worker, meeting_id, username, request),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn resume_consumer(
        &self,
        meeting_id: &MeetingId,
        username: &str,
        request: &ConsumerRequest,
    ) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::ResumeConsumer,
            &worker,
            self.worker_client
                .resume_consumer(&worker, meeting_id, username, request),
        )
        .await
    }

    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn get_meeting_info(&self, meeting_id: &MeetingId) -> BrokerResult<Value> {
        let worker = self.affinity.lookup(meeting_id).await?;
        self.forward(
            WorkerOperation::GetMeetingInfo,
            &worker,
            self.worker_client.get_meeting_info(&worker, meeting_id),
        )
        .await
    }

    /// Await a worker call, normalizing its outcome and recording metrics.
    async fn forward<T, F>(
        &self,
        operation: WorkerOperation,
        worker: &WorkerHandle,
        call: F,
    ) -> BrokerResult<T>
    where
        F: Future<Output = Result<T, WorkerError>>,
    {
        let started_at = Instant::now();
        let outcome = wrap_async(call).await;
        let status = if outcome.is_ok() { "success" } else { "error" };
        metrics::record_worker_call(operation.as_str(), status, started_at.elapsed());

        if let Err(e) = &outcome {
            warn!(
                target: "broker.services.session_router",
                operation = operation.as_str(),
                worker = %worker,
                error = %e,
                "Worker call failed"
            );
        }

        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::BrokerError;
    use crate::services::worker_client::mock::MockWorkerClient;
    use futures::future::join_all;
    use serde_json::json;

    fn router_with(mock: Arc<MockWorkerClient>, workers: usize) -> SessionRouter {
        let endpoints = (0..workers)
            .map(|i| format!("http://worker-{i}:8200"))
            .collect();
        SessionRouter::new(WorkerSelector::new(endpoints).unwrap(), mock)
    }

    fn meeting_id_of(data: &Value) -> MeetingId {
        MeetingId::new(data["meetingId"].as_str().unwrap())
    }

    #[tokio::test]
    async fn test_start_binds_meeting_to_picked_worker() {
        let mock = Arc::new(MockWorkerClient::new());
        let router = router_with(Arc::clone(&mock), 3);

        let data = router.start_meeting("alice").await.unwrap();
        let meeting_id = meeting_id_of(&data);

        let bound = router.affinity().lookup(&meeting_id).await.unwrap();
        assert_eq!(bound.ordinal(), 0);
        assert_eq!(data["worker"], "worker-0");
    }

    #[tokio::test]
    async fn test_operations_follow_the_bound_worker() {
        let mock = Arc::new(MockWorkerClient::new());
        let router = router_with(Arc::clone(&mock), 2);

        let first = meeting_id_of(&router.start_meeting("alice").await.unwrap());
        let second = meeting_id_of(&router.start_meeting("bob").await.unwrap());

        let joined_first = router.join_meeting(&first, "carol").await.unwrap();
        let joined_second = router.join_meeting(&second, "dave").await.unwrap();
        let info_first = router.get_meeting_info(&first).await.unwrap();

        assert_eq!(joined_first["worker"], "worker-0");
        assert_eq!(joined_second["worker"], "worker-1");
        assert_eq!(info_first["worker"], "worker-0");
    }

    #[tokio::test]
    async fn test_every_bound_operation_reaches_the_same_worker() {
        let mock = Arc::new(MockWorkerClient::new());
        let router = router_with(Arc::clone(&mock), 3);

        // Advance the cursor so the meeting lands on worker-1.
        router.start_meeting("warmup").await.unwrap();
        let id = meeting_id_of(&router.start_meeting("alice").await.unwrap());

        let producer = ProducerRequest {
            producer_type: "video".to_string(),
        };
        let consumer = ConsumerRequest {
            consumer_id: "c-1".to_string(),
        };

        router.join_meeting(&id, "bob").await.unwrap();
        router
            .connect_transport(
                &id,
                "bob",
                &ConnectTransportRequest {
                    transport_type: "producer".to_string(),
                    dtls_parameters: json!({}),
                },
            )
            .await
            .unwrap();
        router
            .produce_media(
                &id,
                "bob",
                &ProduceMediaRequest {
                    app_data: json!({}),
                    rtp_parameters: json!({}),
                },
            )
            .await
            .unwrap();
        router.pause_producer(&id, "bob", &producer).await.unwrap();
        router.resume_producer(&id, "bob", &producer).await.unwrap();
        router.close_producer(&id, "bob", &producer).await.unwrap();
        router
            .consume_media(
                &id,
                "bob",
                &ConsumeMediaRequest {
                    producer_id: "p-1".to_string(),
                    rtp_capabilities: json!({}),
                },
            )
            .await
            .unwrap();
        router.pause_consumer(&id, "bob", &consumer).await.unwrap();
        router.resume_consumer(&id, "bob", &consumer).await.unwrap();
        router.get_meeting_info(&id).await.unwrap();
        router.leave_meeting(&id, "bob").await.unwrap();
        router.end_meeting(&id, "alice").await.unwrap();

        let calls: Vec<_> = mock
            .calls()
            .await
            .into_iter()
            .filter(|call| call.meeting_id.as_ref() == Some(&id))
            .collect();

        assert_eq!(calls.len(), 13);
        assert!(calls.iter().all(|call| call.worker == 1));
    }

    #[tokio::test]
    async fn test_failed_start_leaves_no_binding() {
        let mock = Arc::new(
            MockWorkerClient::new().failing(WorkerOperation::StartMeeting, "worker is draining"),
        );
        let router = router_with(Arc::clone(&mock), 2);

        let result = router.start_meeting("alice").await;

        assert_eq!(
            result,
            Err(BrokerError::Upstream("worker is draining".to_string()))
        );
        assert!(router.affinity().is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_start_still_advances_the_cursor() {
        let mock = Arc::new(
            MockWorkerClient::new().failing(WorkerOperation::StartMeeting, "worker is draining"),
        );
        let router = router_with(Arc::clone(&mock), 2);

        let _ = router.start_meeting("alice").await;
        let _ = router.start_meeting("bob").await;

        let workers: Vec<usize> = mock.calls().await.iter().map(|c| c.worker).collect();
        assert_eq!(workers, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_failed_end_keeps_binding() {
        let mock = Arc::new(
            MockWorkerClient::new().failing(WorkerOperation::EndMeeting, "meeting is recording"),
        );
        let router = router_with(Arc::clone(&mock), 1);

        let id = meeting_id_of(&router.start_meeting("alice").await.unwrap());
        let result = router.end_meeting(&id, "alice").await;

        assert_eq!(
            result,
            Err(BrokerError::Upstream("meeting is recording".to_string()))
        );
        assert!(router.affinity().lookup(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_end_releases_binding() {
        let mock = Arc::new(MockWorkerClient::new());
        let router = router_with(Arc::clone(&mock), 1);

        let id = meeting_id_of(&router.start_meeting("alice").await.unwrap());
        router.end_meeting(&id, "alice").await.unwrap();

        assert_eq!(
            router.join_meeting(&id, "bob").await,
            Err(BrokerError::MeetingNotFound(id.clone()))
        );
    }

    #[tokio::test]
    async fn test_unknown_meeting_never_contacts_a_worker() {
        let mock = Arc::new(MockWorkerClient::new());
        let router = router_with(Arc::clone(&mock), 2);
        let ghost = MeetingId::from("ghost");

        assert_eq!(
            router.join_meeting(&ghost, "alice").await,
            Err(BrokerError::MeetingNotFound(ghost.clone()))
        );
        assert_eq!(
            router.end_meeting(&ghost, "alice").await,
            Err(BrokerError::MeetingNotFound(ghost.clone()))
        );
        assert_eq!(
            router.get_meeting_info(&ghost).await,
            Err(BrokerError::MeetingNotFound(ghost))
        );
        assert_eq!(mock.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_worker_panic_becomes_upstream_failure() {
        let mock = Arc::new(MockWorkerClient::new().panicking(WorkerOperation::JoinMeeting));
        let router = router_with(Arc::clone(&mock), 1);

        let id = meeting_id_of(&router.start_meeting("alice").await.unwrap());
        let result = router.join_meeting(&id, "bob").await;

        assert_eq!(
            result,
            Err(BrokerError::Upstream(
                "mock worker panicked during join_meeting".to_string()
            ))
        );
        // The router is still usable afterwards.
        assert!(router.get_meeting_info(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_meeting_id_from_worker_is_a_conflict() {
        let mock = Arc::new(MockWorkerClient::new().with_meeting_ids(&["same", "same"]));
        let router = router_with(Arc::clone(&mock), 2);

        router.start_meeting("alice").await.unwrap();
        let second = router.start_meeting("bob").await;

        assert_eq!(
            second,
            Err(BrokerError::MeetingAlreadyPresent(MeetingId::from("same")))
        );
        let bound = router.affinity().lookup(&MeetingId::from("same")).await.unwrap();
        assert_eq!(bound.ordinal(), 0);
    }

    #[tokio::test]
    async fn test_worker_status_reports_meetings_per_worker() {
        let mock = Arc::new(MockWorkerClient::new());
        let router = router_with(Arc::clone(&mock), 2);

        for user in ["a", "b", "c"] {
            router.start_meeting(user).await.unwrap();
        }

        let status = router.worker_status().await;
        let counts: Vec<usize> = status.iter().map(|s| s.active_meetings).collect();
        assert_eq!(counts, vec![2, 1]);
        assert_eq!(status.first().unwrap().endpoint, "http://worker-0:8200");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_spread_over_the_pool() {
        let mock = Arc::new(MockWorkerClient::new());
        let router = Arc::new(router_with(Arc::clone(&mock), 3));

        let tasks = (0..9).map(|i| {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.start_meeting(&format!("user-{i}")).await })
        });

        for joined in join_all(tasks).await {
            joined.unwrap().unwrap();
        }

        let counts: Vec<usize> = router
            .worker_status()
            .await
            .iter()
            .map(|s| s.active_meetings)
            .collect();
        assert_eq!(counts, vec![3, 3, 3]);
    }
}
