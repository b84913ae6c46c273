//! Meeting affinity repository.
//!
//! Holds the meeting → worker bindings that keep every operation for a
//! meeting on the worker that started it.
//!
//! # Invariants
//!
//! - At most one entry per meeting id.
//! - No operation overwrites an existing entry; rebinding requires `unbind`.
//! - Check-then-mutate sequences run under a single write guard, so two
//!   concurrent binds for the same id cannot both succeed.
//!
//! State is memory-resident only; a restart loses every binding.

use crate::errors::{BrokerError, BrokerResult};
use crate::models::{MeetingId, WorkerHandle};
use crate::observability::metrics;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;

/// In-memory affinity table.
#[derive(Debug, Default)]
pub struct MeetingAffinityRepository {
    entries: RwLock<HashMap<MeetingId, WorkerHandle>>,
}

impl MeetingAffinityRepository {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the worker bound to `meeting_id`.
    ///
    /// # Errors
    ///
    /// - `BrokerError::MeetingNotFound` - no binding exists
    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn lookup(&self, meeting_id: &MeetingId) -> BrokerResult<WorkerHandle> {
        let entries = self.entries.read().await;

        match entries.get(meeting_id) {
            Some(worker) => Ok(worker.clone()),
            None => {
                tracing::debug!(
                    target: "broker.repositories.meeting_affinity",
                    meeting_id = %meeting_id,
                    "Lookup for unbound meeting"
                );
                Err(BrokerError::MeetingNotFound(meeting_id.clone()))
            }
        }
    }

    /// Bind `meeting_id` to `worker`.
    ///
    /// # Errors
    ///
    /// - `BrokerError::MeetingAlreadyPresent` - a binding already exists; the
    ///   table is left unchanged
    #[instrument(skip_all, fields(meeting_id = %meeting_id, worker = %worker.label()))]
    pub async fn bind(&self, meeting_id: MeetingId, worker: WorkerHandle) -> BrokerResult<()> {
        let mut entries = self.entries.write().await;

        match entries.entry(meeting_id) {
            Entry::Occupied(occupied) => {
                metrics::record_affinity_operation("bind", "conflict");
                tracing::warn!(
                    target: "broker.repositories.meeting_affinity",
                    meeting_id = %occupied.key(),
                    bound_worker = %occupied.get().label(),
                    rejected_worker = %worker.label(),
                    "Meeting already bound"
                );
                Err(BrokerError::MeetingAlreadyPresent(occupied.key().clone()))
            }
            Entry::Vacant(vacant) => {
                tracing::info!(
                    target: "broker.repositories.meeting_affinity",
                    meeting_id = %vacant.key(),
                    worker = %worker,
                    "Meeting bound to worker"
                );
                vacant.insert(worker);
                metrics::record_affinity_operation("bind", "success");
                metrics::set_active_meetings(entries.len());
                Ok(())
            }
        }
    }

    /// Remove the binding for `meeting_id`.
    ///
    /// # Errors
    ///
    /// - `BrokerError::MeetingNotFound` - no binding exists
    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    pub async fn unbind(&self, meeting_id: &MeetingId) -> BrokerResult<()> {
        let mut entries = self.entries.write().await;

        match entries.remove(meeting_id) {
            Some(worker) => {
                tracing::info!(
                    target: "broker.repositories.meeting_affinity",
                    meeting_id = %meeting_id,
                    worker = %worker,
                    "Meeting unbound from worker"
                );
                metrics::record_affinity_operation("unbind", "success");
                metrics::set_active_meetings(entries.len());
                Ok(())
            }
            None => {
                metrics::record_affinity_operation("unbind", "not_found");
                Err(BrokerError::MeetingNotFound(meeting_id.clone()))
            }
        }
    }

    /// Number of active bindings.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the table holds no bindings.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Active meeting count per worker ordinal.
    pub async fn meetings_per_worker(&self) -> HashMap<usize, usize> {
        let entries = self.entries.read().await;
        let mut counts = HashMap::new();
        for worker in entries.values() {
            *counts.entry(worker.ordinal()).or_insert(0) += 1;
        }
        counts
    }
}
