//! Bounded-concurrency admission gate.
//!
//! Every run — single, bulk, or queued sub-operation — passes through one
//! global semaphore sized to the configured maximum. Submissions are never
//! dropped: a run that cannot start immediately stays `Queued` and its
//! supervision task waits FIFO for a slot. Duplicate submissions for the
//! same job are distinct runs by contract; deduplication belongs to the
//! caller.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::Semaphore;

use applyflow_commons::models::{QueueOperation, QueueStatus, RunOptions, RunStatus};
use applyflow_commons::{OrchestratorError, QueueId, Result, RunId};

use crate::exec::ProcessExecutor;
use crate::notify::{self, NotifyHook};
use crate::persist::PersistenceBridge;
use crate::runs::RunRegistry;

use super::queue::OperationQueue;

/// How long a fire-and-forget admission notification may take.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(2);

pub struct AdmissionController {
    registry: Arc<RunRegistry>,
    executor: Arc<ProcessExecutor>,
    bridge: Arc<PersistenceBridge>,
    semaphore: Arc<Semaphore>,
    queue: Arc<OperationQueue>,
    notify_hook: Option<Arc<dyn NotifyHook>>,
    max_concurrency: usize,
    /// Nominal per-item duration used for queue wait estimates
    nominal_item_duration: Duration,
}

impl AdmissionController {
    pub fn new(
        registry: Arc<RunRegistry>,
        executor: Arc<ProcessExecutor>,
        bridge: Arc<PersistenceBridge>,
        max_concurrency: usize,
        nominal_item_duration: Duration,
        notify_hook: Option<Arc<dyn NotifyHook>>,
    ) -> Self {
        Self {
            registry,
            executor,
            bridge,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            queue: Arc::new(OperationQueue::new()),
            notify_hook,
            max_concurrency,
            nominal_item_duration,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn queue(&self) -> &Arc<OperationQueue> {
        &self.queue
    }

    /// Admit a single pipeline run. The run starts `Queued`; its
    /// supervision task promotes it to `Running` once a slot frees.
    pub fn submit(&self, job_id: &str, options: RunOptions) -> Result<RunId> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "job_id is required".into(),
            ));
        }
        let run_id = self.registry.create(job_id, options, None);
        self.dispatch(run_id.clone(), None);
        if let Some(hook) = &self.notify_hook {
            notify::fire_and_forget(
                hook.clone(),
                run_id.clone(),
                job_id.to_string(),
                NOTIFY_TIMEOUT,
            );
        }
        Ok(run_id)
    }

    /// Admit one run per job id under the same global ceiling. FIFO order
    /// holds across this submission event; no ordering is guaranteed
    /// relative to other batches.
    pub fn submit_bulk(&self, job_ids: &[String], options: RunOptions) -> Result<Vec<RunId>> {
        if job_ids.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "job_ids must not be empty".into(),
            ));
        }
        // Admission errors must leave no side effects: reject the whole
        // batch before the first run is created
        if job_ids.iter().any(|job_id| job_id.trim().is_empty()) {
            return Err(OrchestratorError::InvalidInput(
                "every job_id must be non-empty".into(),
            ));
        }
        job_ids
            .iter()
            .map(|job_id| self.submit(job_id, options.clone()))
            .collect()
    }

    /// Enqueue a named sub-operation. Returns the queue id and the
    /// 1-indexed position at enqueue time.
    pub fn queue_operation(
        &self,
        job_id: &str,
        operation: QueueOperation,
        options: RunOptions,
    ) -> Result<(QueueId, usize)> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "job_id is required".into(),
            ));
        }
        let queue_id = self.queue.push(job_id, operation, options.clone());
        let run_id = self.registry.create(job_id, options, Some(operation));
        self.queue.link_run(&queue_id, run_id.clone());
        self.dispatch(run_id, Some(queue_id.clone()));
        let position = self.queue.position(&queue_id).unwrap_or(1);
        Ok((queue_id, position))
    }

    /// Estimated wait in seconds for a queue entry, from queue depth and
    /// the nominal per-item duration. Recomputed per call.
    pub fn estimated_wait(&self, queue_id: &QueueId) -> Option<u64> {
        let entry = self.queue.get(queue_id)?;
        let position = self.queue.position(queue_id)?;
        let ahead = position.saturating_sub(1) + self.queue.running_count(entry.operation);
        Some(ahead as u64 * self.nominal_item_duration.as_secs())
    }

    /// Request cancellation of a run. Idempotent: cancelling a finished or
    /// already-cancelled run is a no-op, not an error. Returns the status
    /// observed at call time.
    pub fn cancel(&self, run_id: &RunId) -> Result<RunStatus> {
        let run = self
            .registry
            .snapshot(run_id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("Run {} not found", run_id)))?;
        if run.status.is_terminal() {
            return Ok(run.status);
        }
        if let Some(handle) = self.registry.cancel_handle(run_id) {
            if handle.request() {
                info!("Cancellation requested for run {}", run_id);
            }
        }
        Ok(run.status)
    }

    /// Spawn the supervision task: wait FIFO for a slot, promote to
    /// `Running`, execute, release the slot, and mirror the outcome onto
    /// the queue entry when one backs this run.
    fn dispatch(&self, run_id: RunId, queue_id: Option<QueueId>) {
        let semaphore = self.semaphore.clone();
        let registry = self.registry.clone();
        let executor = self.executor.clone();
        let bridge = self.bridge.clone();
        let queue = self.queue.clone();

        tokio::spawn(async move {
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // Semaphore closed only during shutdown
                    warn!("Admission gate closed; run {} abandoned", run_id);
                    return;
                }
            };

            if registry.transition(&run_id, RunStatus::Running).is_err() {
                drop(permit);
                return;
            }
            if let Some(queue_id) = &queue_id {
                queue.set_status(queue_id, QueueStatus::Running);
            }
            if let Some(run) = registry.snapshot(&run_id) {
                bridge
                    .persist(
                        &run.job_id,
                        &run_id,
                        RunStatus::Running,
                        run.started_at,
                        run.updated_at,
                        &run.artifacts,
                        None,
                    )
                    .await;
            }

            let outcome = executor.execute(&run_id).await;
            drop(permit);

            if let Some(queue_id) = &queue_id {
                let status = if outcome.success {
                    QueueStatus::Completed
                } else {
                    QueueStatus::Failed
                };
                queue.set_status(queue_id, status);
            }
        });
    }
}
