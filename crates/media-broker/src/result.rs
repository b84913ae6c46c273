//! Result normalization for the routing core.
//!
//! Worker calls may fail in two ways: by returning an error, or by
//! panicking. `wrap` and `wrap_async` fold both into a `BrokerResult` so the
//! routing facade exits through exactly one vocabulary. Errors that are
//! already `BrokerError` (affinity table failures) pass through untouched.
//!
//! `Envelope` is the serialized form of a `BrokerResult`:
//!
//! ```json
//! { "status": "success", "data": { "meetingId": "..." } }
//! { "status": "failed", "code": "NOT_FOUND", "message": "no meeting with id m1" }
//! ```

use crate::errors::{BrokerError, BrokerResult};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

/// Message used when a panic payload carries no printable text.
const OPAQUE_PANIC_MESSAGE: &str = "worker call panicked";

/// Run `computation`, converting an error or a panic into a `BrokerError`.
pub fn wrap<T, E, F>(computation: F) -> BrokerResult<T>
where
    E: Into<BrokerError>,
    F: FnOnce() -> Result<T, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(computation)) {
        Ok(outcome) => outcome.map_err(Into::into),
        Err(payload) => Err(BrokerError::Upstream(panic_message(payload.as_ref()))),
    }
}

/// Async counterpart of [`wrap`].
pub async fn wrap_async<T, E, F>(computation: F) -> BrokerResult<T>
where
    E: Into<BrokerError>,
    F: Future<Output = Result<T, E>>,
{
    match AssertUnwindSafe(computation).catch_unwind().await {
        Ok(outcome) => outcome.map_err(Into::into),
        Err(payload) => Err(BrokerError::Upstream(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        OPAQUE_PANIC_MESSAGE.to_string()
    }
}

/// Wire form of a `BrokerResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Envelope<T> {
    /// The operation completed.
    Success {
        /// Operation output.
        data: T,
    },

    /// The operation failed.
    Failed {
        /// Machine-readable error code, when produced by the broker.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,

        /// Human-readable failure message.
        message: String,
    },
}

impl<T> From<BrokerResult<T>> for Envelope<T> {
    fn from(result: BrokerResult<T>) -> Self {
        match result {
            Ok(data) => Envelope::Success { data },
            Err(error) => Envelope::Failed {
                code: Some(error.code().to_string()),
                message: error.to_string(),
            },
        }
    }
}
