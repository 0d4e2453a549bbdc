//! Write-through reconciliation of run state into the durable job record.
//!
//! The bridge trusts data presence, not run status: progress flags derive
//! purely from what the pipeline state actually contains, so partial
//! progress is visible while a run is still `running`. Full state-field
//! values only reach the record once the run is `completed`, which keeps a
//! later-stage failure from leaking stale partial content. Every write is
//! best-effort; storage failures are logged and swallowed and can never
//! fail a run.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::{json, Value};

use applyflow_commons::models::{JobKey, JobUpdate, RunStatus};
use applyflow_commons::RunId;
use applyflow_store::{JobStore, UpdateOutcome};

/// State fields that flip the `job_description_processed` flag.
const PAIN_POINT_FIELDS: &[&str] = &["pain_points", "pain_point_analysis"];
/// State fields that flip the `research_available` flag.
const RESEARCH_FIELDS: &[&str] = &["company_research", "role_research"];
/// State fields that flip the `cv_generated` flag.
const CV_FIELDS: &[&str] = &["cv_text", "cv_editor_state"];

/// Human-facing status written on terminal success; the single UI-visible
/// completion signal.
const READY_STATUS: &str = "ready for review";

fn field_present(state: &Value, field: &str) -> bool {
    match state.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

fn any_present(state: &Value, fields: &[&str]) -> bool {
    fields.iter().any(|f| field_present(state, f))
}

/// Derive progress flags from pipeline-state content. Pure function of
/// `final_state`, independent of run status; flags are only ever set to
/// true.
pub fn derive_flags(final_state: Option<&Value>) -> Vec<&'static str> {
    let Some(state) = final_state else {
        return Vec::new();
    };
    let mut flags = Vec::new();
    if any_present(state, PAIN_POINT_FIELDS) {
        flags.push("job_description_processed");
    }
    if any_present(state, RESEARCH_FIELDS) {
        flags.push("research_available");
    }
    if any_present(state, CV_FIELDS) {
        flags.push("cv_generated");
    }
    flags
}

/// Best-effort writer of run bookkeeping and derived progress into the
/// job's durable record. When no store is configured, every call silently
/// no-ops.
pub struct PersistenceBridge {
    store: Option<Arc<dyn JobStore>>,
}

impl PersistenceBridge {
    pub fn new(store: Option<Arc<dyn JobStore>>) -> Self {
        Self { store }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Reconcile one run's current state into the job record. Bookkeeping
    /// fields always; flags from data presence; full state values and the
    /// human-facing status only on `completed`.
    #[allow(clippy::too_many_arguments)]
    pub async fn persist(
        &self,
        job_id: &str,
        run_id: &RunId,
        status: RunStatus,
        started_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        artifacts: &BTreeMap<String, String>,
        final_state: Option<&Value>,
    ) {
        if self.store.is_none() {
            return;
        }

        let mut update = JobUpdate::new();
        update.set("pipeline_run_id", json!(run_id.as_str()));
        update.set("pipeline_status", json!(status.as_str()));
        update.set("pipeline_started_at", json!(started_at.to_rfc3339()));
        update.set("pipeline_updated_at", json!(updated_at.to_rfc3339()));
        if !artifacts.is_empty() {
            update.set("artifact_urls", json!(artifacts));
        }

        for flag in derive_flags(final_state) {
            update.flag(flag);
        }

        if status == RunStatus::Completed {
            update.set("pipeline_completed_at", json!(updated_at.to_rfc3339()));
            update.set("status", json!(READY_STATUS));
            if let Some(state) = final_state {
                for field in PAIN_POINT_FIELDS
                    .iter()
                    .chain(RESEARCH_FIELDS)
                    .chain(CV_FIELDS)
                {
                    if field_present(state, field) {
                        update.set(*field, state.get(*field).cloned().unwrap_or(Value::Null));
                    }
                }
            }
        }

        self.apply(job_id, update).await;
    }

    /// Record a failure status and error string without touching progress
    /// flags.
    pub async fn mark_failed(&self, job_id: &str, error: &str) {
        if self.store.is_none() {
            return;
        }
        let mut update = JobUpdate::new();
        update.set("pipeline_status", json!(RunStatus::Failed.as_str()));
        update.set("pipeline_error", json!(error));
        update.set("pipeline_updated_at", json!(Utc::now().to_rfc3339()));
        self.apply(job_id, update).await;
    }

    async fn apply(&self, job_id: &str, update: JobUpdate) {
        let Some(store) = &self.store else {
            return;
        };
        let key = JobKey::from_raw(job_id);
        match store.update_job(&key, update).await {
            Ok(UpdateOutcome::Applied) => {}
            Ok(UpdateOutcome::Missing) => {
                debug!("Job record {} missing; persistence write skipped", key);
            }
            Err(e) => {
                // Never aborts a run and never crashes the service
                warn!("Persistence write for job {} failed: {}", key, e);
            }
        }
    }
}
