//! Service layer for the Media Broker.
//!
//! - `worker_selection` - round-robin worker picks for new meetings
//! - `worker_client` - calls into media workers (HTTP and mock)
//! - `session_router` - routes every session operation to its meeting's worker

pub mod session_router;
pub mod worker_client;
pub mod worker_selection;

pub use session_router::SessionRouter;
pub use worker_client::{HttpWorkerClient, WorkerClientTrait, WorkerError, WorkerOperation};
pub use worker_selection::WorkerSelector;
