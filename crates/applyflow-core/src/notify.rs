//! Post-admission notification hook.
//!
//! The orchestrator can tell an external collaborator (chat bot, CRUD
//! layer) that a run was admitted. Delivery is strictly fire-and-forget:
//! bounded by a short timeout, failures swallowed, and admission never
//! depends on the outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};

use applyflow_commons::RunId;

/// Callback invoked after a run is successfully admitted.
#[async_trait]
pub trait NotifyHook: Send + Sync {
    async fn run_admitted(&self, run_id: &RunId, job_id: &str);
}

/// Built-in hook that records admissions on the service log.
pub struct LogNotifier;

#[async_trait]
impl NotifyHook for LogNotifier {
    async fn run_admitted(&self, run_id: &RunId, job_id: &str) {
        info!("Admitted run {} for job {}", run_id, job_id);
    }
}

/// Dispatch the hook without waiting for it. The spawned task is bounded
/// by `timeout`; a slow or failing hook only produces a debug line.
pub fn fire_and_forget(
    hook: Arc<dyn NotifyHook>,
    run_id: RunId,
    job_id: String,
    timeout: Duration,
) {
    tokio::spawn(async move {
        if tokio::time::timeout(timeout, hook.run_admitted(&run_id, &job_id))
            .await
            .is_err()
        {
            debug!("Admission notification for run {} timed out", run_id);
        }
    });
}
