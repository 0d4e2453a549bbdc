//! In-memory run registry.
//!
//! Source of truth for run status until the persistence bridge writes
//! through to the durable job record. Each entry is guarded by the map
//! shard lock, so a single run's fields always update atomically with
//! respect to concurrent readers: no torn log buffer, no status/timestamp
//! pair from two different transitions. The registry is not durable; a
//! restart forgets every run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::{debug, warn};
use serde_json::Value;
use tokio::sync::Notify;

use applyflow_commons::models::{QueueOperation, RunOptions, RunStatus};
use applyflow_commons::{OrchestratorError, Result, RunId};

use super::LogBuffer;

/// One supervised execution of the pipeline program.
#[derive(Debug, Clone)]
pub struct Run {
    pub run_id: RunId,
    pub job_id: String,
    pub status: RunStatus,
    pub options: RunOptions,
    /// Set when the run executes a queued sub-operation instead of the
    /// full pipeline
    pub operation: Option<QueueOperation>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub logs: LogBuffer,
    pub artifacts: BTreeMap<String, String>,
    pub final_state: Option<Value>,
}

/// Cancellation handle shared between the registry and the executor.
///
/// The executor listens on `notify` while the child runs; a cancellation
/// request flips the flag exactly once and wakes the listener. Requests
/// after the first (or after the run finished) are no-ops.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    /// Request cancellation. Returns true only for the first request.
    pub fn request(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        // Register the waiter before re-checking the flag: `request()`
        // uses `notify_waiters`, which does not store a permit, so a
        // request landing between a bare flag check and `notified().await`
        // would never be observed.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

struct RunSlot {
    run: Run,
    cancel: CancelHandle,
}

/// In-memory table of all known runs, keyed by run id.
pub struct RunRegistry {
    runs: DashMap<RunId, RunSlot>,
    log_cap: usize,
}

impl RunRegistry {
    pub fn new(log_cap: usize) -> Self {
        Self {
            runs: DashMap::new(),
            log_cap,
        }
    }

    /// Create a run in `Queued` state and return its generated id.
    pub fn create(
        &self,
        job_id: &str,
        options: RunOptions,
        operation: Option<QueueOperation>,
    ) -> RunId {
        let run_id = RunId::generate();
        let now = Utc::now();
        let run = Run {
            run_id: run_id.clone(),
            job_id: job_id.to_string(),
            status: RunStatus::Queued,
            options,
            operation,
            started_at: now,
            updated_at: now,
            logs: LogBuffer::new(self.log_cap),
            artifacts: BTreeMap::new(),
            final_state: None,
        };
        self.runs.insert(
            run_id.clone(),
            RunSlot {
                run,
                cancel: CancelHandle::default(),
            },
        );
        run_id
    }

    /// Clone-out snapshot of a run.
    pub fn snapshot(&self, run_id: &RunId) -> Option<Run> {
        self.runs.get(run_id).map(|slot| slot.run.clone())
    }

    pub fn contains(&self, run_id: &RunId) -> bool {
        self.runs.contains_key(run_id)
    }

    /// Apply a monotonic status transition. Illegal transitions (including
    /// any attempt to leave a terminal status) are refused.
    pub fn transition(&self, run_id: &RunId, next: RunStatus) -> Result<()> {
        let mut slot = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("Run {} not found", run_id)))?;
        let current = slot.run.status;
        if !current.can_transition_to(next) {
            warn!(
                "Refusing illegal run transition {} -> {} for {}",
                current, next, run_id
            );
            return Err(OrchestratorError::Internal(format!(
                "Illegal transition {} -> {} for run {}",
                current, next, run_id
            )));
        }
        slot.run.status = next;
        slot.run.updated_at = Utc::now();
        debug!("Run {} transitioned {} -> {}", run_id, current, next);
        Ok(())
    }

    /// Append a log line; empty lines are discarded.
    pub fn append_log(&self, run_id: &RunId, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if let Some(mut slot) = self.runs.get_mut(run_id) {
            slot.run.logs.push(line.to_string());
            slot.run.updated_at = Utc::now();
        }
    }

    pub fn set_artifacts(&self, run_id: &RunId, artifacts: BTreeMap<String, String>) {
        if let Some(mut slot) = self.runs.get_mut(run_id) {
            slot.run.artifacts = artifacts;
            slot.run.updated_at = Utc::now();
        }
    }

    pub fn set_final_state(&self, run_id: &RunId, state: Value) {
        if let Some(mut slot) = self.runs.get_mut(run_id) {
            slot.run.final_state = Some(state);
            slot.run.updated_at = Utc::now();
        }
    }

    /// Log lines after `cursor` plus the new cursor and whether the run is
    /// terminal, read under one lock so streams see a consistent view.
    pub fn logs_since(&self, run_id: &RunId, cursor: u64) -> Option<(Vec<String>, u64, bool)> {
        self.runs.get(run_id).map(|slot| {
            let (lines, next) = slot.run.logs.lines_since(cursor);
            (lines, next, slot.run.status.is_terminal())
        })
    }

    pub fn cancel_handle(&self, run_id: &RunId) -> Option<CancelHandle> {
        self.runs.get(run_id).map(|slot| slot.cancel.clone())
    }

    pub fn running_count(&self) -> usize {
        self.runs
            .iter()
            .filter(|slot| slot.run.status == RunStatus::Running)
            .count()
    }

    pub fn queued_count(&self) -> usize {
        self.runs
            .iter()
            .filter(|slot| slot.run.status == RunStatus::Queued)
            .count()
    }

    /// Drop terminal runs whose last update is older than `retention`.
    /// Returns how many were removed.
    pub fn prune_finished(&self, retention: Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let before = self.runs.len();
        self.runs
            .retain(|_, slot| !(slot.run.status.is_terminal() && slot.run.updated_at < cutoff));
        before - self.runs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RunRegistry {
        RunRegistry::new(100)
    }

    #[test]
    fn create_starts_queued() {
        let reg = registry();
        let run_id = reg.create("42", RunOptions::default(), None);
        let run = reg.snapshot(&run_id).unwrap();
        assert_eq!(run.status, RunStatus::Queued);
        assert_eq!(run.job_id, "42");
        assert!(run.logs.is_empty());
    }

    #[test]
    fn transitions_are_monotonic() {
        let reg = registry();
        let run_id = reg.create("42", RunOptions::default(), None);
        reg.transition(&run_id, RunStatus::Running).unwrap();
        reg.transition(&run_id, RunStatus::Completed).unwrap();
        // Terminal status never re-enters running
        assert!(reg.transition(&run_id, RunStatus::Running).is_err());
        assert!(reg.transition(&run_id, RunStatus::Failed).is_err());
        assert_eq!(reg.snapshot(&run_id).unwrap().status, RunStatus::Completed);
    }

    #[test]
    fn queued_cannot_complete_directly() {
        let reg = registry();
        let run_id = reg.create("42", RunOptions::default(), None);
        assert!(reg.transition(&run_id, RunStatus::Completed).is_err());
    }

    #[test]
    fn empty_log_lines_are_discarded() {
        let reg = registry();
        let run_id = reg.create("42", RunOptions::default(), None);
        reg.append_log(&run_id, "real line");
        reg.append_log(&run_id, "");
        reg.append_log(&run_id, "   ");
        assert_eq!(reg.snapshot(&run_id).unwrap().logs.len(), 1);
    }

    #[test]
    fn cancel_handle_first_request_wins() {
        let reg = registry();
        let run_id = reg.create("42", RunOptions::default(), None);
        let handle = reg.cancel_handle(&run_id).unwrap();
        assert!(handle.request());
        assert!(!handle.request());
        assert!(handle.is_requested());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_after_request() {
        let handle = CancelHandle::default();
        handle.request();
        // Must resolve even though no waiter was registered at request time
        tokio::time::timeout(std::time::Duration::from_secs(1), handle.cancelled())
            .await
            .expect("cancelled() should resolve for an already-requested handle");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_wakeup_is_never_lost() {
        // Race request() against a freshly registered waiter many times;
        // a dropped wakeup shows up as a timeout
        for _ in 0..200 {
            let handle = CancelHandle::default();
            let waiter = {
                let handle = handle.clone();
                tokio::spawn(async move { handle.cancelled().await })
            };
            tokio::task::yield_now().await;
            handle.request();
            tokio::time::timeout(std::time::Duration::from_secs(2), waiter)
                .await
                .expect("cancellation wakeup was lost")
                .unwrap();
        }
    }

    #[test]
    fn prune_keeps_active_runs() {
        let reg = registry();
        let active = reg.create("1", RunOptions::default(), None);
        let done = reg.create("2", RunOptions::default(), None);
        reg.transition(&done, RunStatus::Running).unwrap();
        reg.transition(&done, RunStatus::Failed).unwrap();

        // Zero retention prunes every terminal run immediately
        let removed = reg.prune_finished(Duration::zero());
        assert_eq!(removed, 1);
        assert!(reg.contains(&active));
        assert!(!reg.contains(&done));
    }
}
