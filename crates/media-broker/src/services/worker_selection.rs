//! Worker Selection Service.
//!
//! Picks the worker that hosts a newly started meeting using strict
//! round-robin over the pool configured at startup.
//!
//! With N workers, N consecutive picks return each worker exactly once and
//! the (N+1)-th pick repeats the first. The cursor moves by one position per
//! pick regardless of whether the subsequent worker call succeeds.

use crate::config::ConfigError;
use crate::models::WorkerHandle;
use crate::observability::metrics;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin selector over an immutable, non-empty worker pool.
#[derive(Debug)]
pub struct WorkerSelector {
    workers: Vec<WorkerHandle>,
    cursor: AtomicUsize,
}

impl WorkerSelector {
    /// Build the pool from the configured endpoints, in order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyWorkerPool` if `endpoints` is empty.
    pub fn new(endpoints: Vec<String>) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::EmptyWorkerPool);
        }

        let workers = endpoints
            .into_iter()
            .enumerate()
            .map(|(ordinal, endpoint)| WorkerHandle::new(ordinal, endpoint))
            .collect();

        Ok(Self {
            workers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Pick the next worker in round-robin order.
    pub fn pick_worker(&self) -> WorkerHandle {
        let len = self.workers.len();
        let index = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some((current + 1) % len)
            })
            .unwrap_or_else(|current| current);

        // Allow: the cursor only ever holds values reduced mod len, and len > 0.
        #[allow(clippy::indexing_slicing)]
        let worker = self.workers[index].clone();

        tracing::debug!(
            target: "broker.services.worker_selection",
            worker = %worker,
            "Selected worker"
        );
        metrics::record_worker_selection(&worker.label());

        worker
    }

    /// All workers, in pool order.
    pub fn workers(&self) -> &[WorkerHandle] {
        &self.workers
    }

    /// Number of workers in the pool. Never zero.
    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }
}
