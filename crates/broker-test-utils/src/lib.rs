//! # Broker Test Utilities
//!
//! Shared test utilities for the Media Broker.
//!
//! This crate provides:
//! - Server test harness (`TestBrokerServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use broker_test_utils::*;
//! use media_broker::services::worker_client::mock::MockWorkerClient;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestBrokerServer::spawn(MockWorkerClient::new()).await?;
//!
//!     let response = reqwest::Client::new()
//!         .post(format!("{}/meetings/start", server.url()))
//!         .header("x-username", "alice")
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

// Re-export commonly used items
pub use server_harness::*;
