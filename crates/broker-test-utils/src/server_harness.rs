//! Test server harness for E2E testing
//!
//! Provides `TestBrokerServer` for spawning real broker instances in tests.

use media_broker::config::Config;
use media_broker::observability::metrics::init_metrics_recorder;
use media_broker::routes::{self, AppState};
use media_broker::services::worker_client::mock::MockWorkerClient;
use media_broker::services::{SessionRouter, WorkerClientTrait, WorkerSelector};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Worker pool used when a test does not supply its own.
pub const DEFAULT_TEST_WORKERS: &[&str] = &[
    "http://worker-a.test:8200",
    "http://worker-b.test:8200",
    "http://worker-c.test:8200",
];

/// Global metrics handle shared by every server in the test process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            // Another test binary component may already own the global
            // recorder; fall back to a standalone one.
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the Media Broker in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<(), anyhow::Error> {
///     let server = TestBrokerServer::spawn(MockWorkerClient::new()).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestBrokerServer {
    addr: SocketAddr,
    config: Config,
    router: Arc<SessionRouter>,
    _handle: JoinHandle<()>,
}

impl TestBrokerServer {
    /// Spawn a broker over [`DEFAULT_TEST_WORKERS`] backed by `mock`.
    ///
    /// The mock is shared; keep an `Arc` to it with
    /// [`TestBrokerServer::spawn_with_client`] when the test inspects calls.
    pub async fn spawn(mock: MockWorkerClient) -> Result<Self, anyhow::Error> {
        Self::spawn_with_client(DEFAULT_TEST_WORKERS, Arc::new(mock)).await
    }

    /// Spawn a broker over `workers` using `client` for every worker call.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_client(
        workers: &[&str],
        client: Arc<dyn WorkerClientTrait>,
    ) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("WORKER_ENDPOINTS".to_string(), workers.join(",")),
            ("WORKER_REQUEST_TIMEOUT_SECONDS".to_string(), "2".to_string()),
            ("WORKER_CONNECT_TIMEOUT_SECONDS".to_string(), "1".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let selector = WorkerSelector::new(config.worker_endpoints.clone())
            .map_err(|e| anyhow::anyhow!("Failed to create worker pool: {}", e))?;
        let router = Arc::new(SessionRouter::new(selector, client));

        let state = Arc::new(AppState {
            router: Arc::clone(&router),
        });

        // Build routes using the broker's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            router,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Routing facade behind the server, for asserting on affinity state.
    pub fn router(&self) -> &SessionRouter {
        &self.router
    }
}

impl Drop for TestBrokerServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
