//! Meeting routing integration tests.
//!
//! Drives the broker over HTTP with a mock worker client and asserts which
//! worker each operation reached.

use broker_test_utils::{TestBrokerServer, DEFAULT_TEST_WORKERS};
use futures::future::join_all;
use media_broker::models::MeetingId;
use media_broker::services::worker_client::mock::{MockWorkerClient, RecordedCall};
use media_broker::services::WorkerOperation;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

struct Harness {
    server: TestBrokerServer,
    mock: Arc<MockWorkerClient>,
    client: reqwest::Client,
}

impl Harness {
    async fn spawn(mock: MockWorkerClient) -> Result<Self, anyhow::Error> {
        let mock = Arc::new(mock);
        let server = TestBrokerServer::spawn_with_client(DEFAULT_TEST_WORKERS, mock.clone()).await?;
        Ok(Self {
            server,
            mock,
            client: reqwest::Client::new(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<(u16, Value), anyhow::Error> {
        let response = self
            .client
            .post(format!("{}{}", self.server.url(), path))
            .header("x-username", "alice")
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    async fn start(&self) -> Result<String, anyhow::Error> {
        let (status, body) = self.post("/meetings/start", json!({})).await?;
        assert_eq!(status, 200, "start failed: {body}");
        body["data"]["meetingId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no meetingId in {body}"))
    }
}

#[tokio::test]
async fn test_start_places_meetings_round_robin() -> Result<(), anyhow::Error> {
    let harness = Harness::spawn(MockWorkerClient::new()).await?;

    let mut placements = Vec::new();
    for _ in 0..4 {
        let (_, body) = harness.post("/meetings/start", json!({})).await?;
        placements.push(body["data"]["worker"].as_str().unwrap_or_default().to_string());
    }

    assert_eq!(placements, vec!["worker-0", "worker-1", "worker-2", "worker-0"]);

    Ok(())
}

#[tokio::test]
async fn test_full_session_stays_on_one_worker() -> Result<(), anyhow::Error> {
    let harness = Harness::spawn(MockWorkerClient::new()).await?;

    // Push the cursor so the meeting lands on worker-1.
    harness.start().await?;
    let meeting = harness.start().await?;

    let steps: Vec<(&str, Value)> = vec![
        ("join", json!({})),
        (
            "connect",
            json!({"transportType": "producer", "dtlsParameters": {"role": "client"}}),
        ),
        (
            "produceMedia",
            json!({"appData": {"mediaTag": "cam"}, "rtpParameters": {"codecs": []}}),
        ),
        ("pauseProducer", json!({"producerType": "video"})),
        ("resumeProducer", json!({"producerType": "video"})),
        (
            "consumeMedia",
            json!({"producerId": "p-1", "rtpCapabilities": {"codecs": []}}),
        ),
        ("pauseConsumer", json!({"consumerId": "c-1"})),
        ("resumeConsumer", json!({"consumerId": "c-1"})),
        ("closeProducer", json!({"producerType": "video"})),
        ("leave", json!({})),
        ("end", json!({})),
    ];

    for (action, body) in steps {
        let (status, reply) = harness
            .post(&format!("/meetings/{meeting}/{action}"), body)
            .await?;
        assert_eq!(status, 200, "{action} failed: {reply}");
        assert_eq!(reply["status"], "success");
        assert_eq!(reply["data"]["worker"], "worker-1", "{action} misrouted");
    }

    let routed: Vec<usize> = harness
        .mock
        .calls()
        .await
        .into_iter()
        .filter(|call| call.meeting_id.as_ref().map(MeetingId::as_str) == Some(meeting.as_str()))
        .map(|call| call.worker)
        .collect();
    assert_eq!(routed.len(), 12);
    assert!(routed.iter().all(|worker| *worker == 1));

    // Ended meetings are forgotten.
    let (status, reply) = harness
        .post(&format!("/meetings/{meeting}/join"), json!({}))
        .await?;
    assert_eq!(status, 404);
    assert_eq!(reply["status"], "failed");

    Ok(())
}

#[tokio::test]
async fn test_get_meeting_info_needs_no_username() -> Result<(), anyhow::Error> {
    let harness = Harness::spawn(MockWorkerClient::new()).await?;
    let meeting = harness.start().await?;

    let response = harness
        .client
        .get(format!("{}/meetings/{}", harness.server.url(), meeting))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["data"]["operation"], "get_meeting_info");
    assert_eq!(body["data"]["worker"], "worker-0");

    Ok(())
}

#[tokio::test]
async fn test_unknown_meeting_is_404_without_worker_call() -> Result<(), anyhow::Error> {
    let harness = Harness::spawn(MockWorkerClient::new()).await?;

    let (status, body) = harness
        .post("/meetings/ghost/consumeMedia", json!({"producerId": "p", "rtpCapabilities": {}}))
        .await?;

    assert_eq!(status, 404);
    assert_eq!(
        body,
        json!({"status": "failed", "code": "NOT_FOUND", "message": "no meeting with id ghost"})
    );
    assert_eq!(harness.mock.call_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_missing_username_is_400() -> Result<(), anyhow::Error> {
    let harness = Harness::spawn(MockWorkerClient::new()).await?;

    let response = harness
        .client
        .post(format!("{}/meetings/start", harness.server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["message"], "missing x-username header");
    assert_eq!(harness.mock.call_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_worker_rejection_is_502_with_worker_message() -> Result<(), anyhow::Error> {
    let mock = MockWorkerClient::new().failing(WorkerOperation::ProduceMedia, "transport not connected");
    let harness = Harness::spawn(mock).await?;
    let meeting = harness.start().await?;

    let (status, body) = harness
        .post(
            &format!("/meetings/{meeting}/produceMedia"),
            json!({"rtpParameters": {}}),
        )
        .await?;

    assert_eq!(status, 502);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["code"], "UPSTREAM_FAILURE");
    assert_eq!(body["message"], "transport not connected");

    Ok(())
}

#[tokio::test]
async fn test_worker_panic_is_502_and_server_keeps_serving() -> Result<(), anyhow::Error> {
    let mock = MockWorkerClient::new().panicking(WorkerOperation::LeaveMeeting);
    let harness = Harness::spawn(mock).await?;
    let meeting = harness.start().await?;

    let (status, body) = harness
        .post(&format!("/meetings/{meeting}/leave"), json!({}))
        .await?;
    assert_eq!(status, 502);
    assert_eq!(body["message"], "mock worker panicked during leave_meeting");

    let (status, _) = harness
        .post(&format!("/meetings/{meeting}/join"), json!({}))
        .await?;
    assert_eq!(status, 200);

    Ok(())
}

#[tokio::test]
async fn test_failed_end_keeps_meeting_routable() -> Result<(), anyhow::Error> {
    let mock = MockWorkerClient::new().failing(WorkerOperation::EndMeeting, "still recording");
    let harness = Harness::spawn(mock).await?;
    let meeting = harness.start().await?;

    let (status, _) = harness
        .post(&format!("/meetings/{meeting}/end"), json!({}))
        .await?;
    assert_eq!(status, 502);

    let (status, _) = harness
        .post(&format!("/meetings/{meeting}/join"), json!({}))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(harness.server.router().affinity().len().await, 1);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_meeting_id_from_worker_is_409() -> Result<(), anyhow::Error> {
    let harness = Harness::spawn(MockWorkerClient::new().with_meeting_ids(&["dup", "dup"])).await?;

    let (status, _) = harness.post("/meetings/start", json!({})).await?;
    assert_eq!(status, 200);

    let (status, body) = harness.post("/meetings/start", json!({})).await?;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "CONFLICT");

    // The original placement survives.
    let calls = harness.mock.calls().await;
    assert_eq!(
        calls.first(),
        Some(&RecordedCall {
            operation: WorkerOperation::StartMeeting,
            worker: 0,
            meeting_id: Some(MeetingId::from("dup")),
        })
    );
    let (_, body) = harness.post("/meetings/dup/join", json!({})).await?;
    assert_eq!(body["data"]["worker"], "worker-0");

    Ok(())
}

#[tokio::test]
async fn test_concurrent_starts_spread_evenly() -> Result<(), anyhow::Error> {
    let harness = Harness::spawn(MockWorkerClient::new()).await?;

    let starts = (0..30).map(|_| harness.post("/meetings/start", json!({})));
    let results = join_all(starts).await;

    let mut per_worker: HashMap<String, usize> = HashMap::new();
    for result in results {
        let (status, body) = result?;
        assert_eq!(status, 200);
        let worker = body["data"]["worker"].as_str().unwrap_or_default().to_string();
        *per_worker.entry(worker).or_default() += 1;
    }

    assert_eq!(per_worker.len(), 3);
    assert!(per_worker.values().all(|count| *count == 10));
    assert_eq!(harness.server.router().affinity().len().await, 30);

    Ok(())
}
