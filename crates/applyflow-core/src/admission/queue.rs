//! Ordered queue for named pipeline sub-operations.
//!
//! One shared FIFO holds entries for every operation type; positions are
//! computed per operation at query time, never cached. Entries drain
//! through the same global admission gate as full runs, so the concurrency
//! ceiling is system-wide.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use applyflow_commons::models::{QueueOperation, QueueStatus, RunOptions};
use applyflow_commons::{QueueId, RunId};

/// A queued sub-operation targeting one job.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub queue_id: QueueId,
    pub job_id: String,
    pub operation: QueueOperation,
    pub options: RunOptions,
    pub status: QueueStatus,
    pub enqueued_at: DateTime<Utc>,
    /// Run backing this entry once admission created it
    pub run_id: Option<RunId>,
}

/// Shared FIFO of sub-operation entries.
#[derive(Default)]
pub struct OperationQueue {
    entries: RwLock<Vec<QueueEntry>>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new entry (status `Pending`) and return its id.
    pub fn push(&self, job_id: &str, operation: QueueOperation, options: RunOptions) -> QueueId {
        let queue_id = QueueId::generate();
        let entry = QueueEntry {
            queue_id: queue_id.clone(),
            job_id: job_id.to_string(),
            operation,
            options,
            status: QueueStatus::Pending,
            enqueued_at: Utc::now(),
            run_id: None,
        };
        self.entries.write().push(entry);
        queue_id
    }

    pub fn get(&self, queue_id: &QueueId) -> Option<QueueEntry> {
        self.entries
            .read()
            .iter()
            .find(|e| &e.queue_id == queue_id)
            .cloned()
    }

    pub fn link_run(&self, queue_id: &QueueId, run_id: RunId) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|e| &e.queue_id == queue_id) {
            entry.run_id = Some(run_id);
            entry.status = QueueStatus::Queued;
        }
    }

    pub fn set_status(&self, queue_id: &QueueId, status: QueueStatus) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|e| &e.queue_id == queue_id) {
            entry.status = status;
        }
    }

    /// 1-indexed position among not-yet-running entries of the same
    /// operation, in FIFO order. Recomputed on every call. `None` for
    /// unknown ids; running and finished entries report position 0.
    pub fn position(&self, queue_id: &QueueId) -> Option<usize> {
        let entries = self.entries.read();
        let target = entries.iter().find(|e| &e.queue_id == queue_id)?;
        if !matches!(target.status, QueueStatus::Pending | QueueStatus::Queued) {
            return Some(0);
        }
        let ahead = entries
            .iter()
            .take_while(|e| &e.queue_id != queue_id)
            .filter(|e| {
                e.operation == target.operation
                    && matches!(e.status, QueueStatus::Pending | QueueStatus::Queued)
            })
            .count();
        Some(ahead + 1)
    }

    /// Waiting entries for one operation.
    pub fn pending_count(&self, operation: QueueOperation) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|e| {
                e.operation == operation
                    && matches!(e.status, QueueStatus::Pending | QueueStatus::Queued)
            })
            .count()
    }

    pub fn running_count(&self, operation: QueueOperation) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|e| e.operation == operation && e.status == QueueStatus::Running)
            .count()
    }

    /// Depth counters across all operations, for diagnostics.
    pub fn depth(&self) -> (usize, usize) {
        let entries = self.entries.read();
        let pending = entries
            .iter()
            .filter(|e| matches!(e.status, QueueStatus::Pending | QueueStatus::Queued))
            .count();
        let running = entries
            .iter()
            .filter(|e| e.status == QueueStatus::Running)
            .count();
        (pending, running)
    }

    /// Drop terminal entries older than `retention`.
    pub fn prune_finished(&self, retention: Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| !(e.status.is_terminal() && e.enqueued_at < cutoff));
        before - entries.len()
    }
}
