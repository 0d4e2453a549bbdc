//! Response bodies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use applyflow_commons::models::{QueueOperation, QueueStatus, RunStatus};
use applyflow_commons::{QueueId, RunId};
use applyflow_core::runs::Run;

/// Standard error body; the `error` string is always human-readable.
pub fn error_body(message: impl AsRef<str>) -> Value {
    json!({ "error": message.as_ref() })
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub run_id: RunId,
    pub status: RunStatus,
    pub status_url: String,
    pub log_stream_url: String,
}

impl RunResponse {
    pub fn new(run_id: RunId, status: RunStatus) -> Self {
        let status_url = format!("/v1/jobs/{}/status", run_id);
        let log_stream_url = format!("/v1/jobs/{}/logs", run_id);
        Self {
            run_id,
            status,
            status_url,
            log_stream_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkRunItem {
    pub run_id: RunId,
    pub job_id: String,
    pub status: RunStatus,
    pub log_stream_url: String,
}

#[derive(Debug, Serialize)]
pub struct BulkRunResponse {
    pub runs: Vec<BulkRunItem>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub run_id: RunId,
    pub job_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub artifacts: BTreeMap<String, String>,
}

impl From<Run> for StatusResponse {
    fn from(run: Run) -> Self {
        Self {
            run_id: run.run_id,
            job_id: run.job_id,
            status: run.status,
            started_at: run.started_at,
            updated_at: run.updated_at,
            artifacts: run.artifacts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub run_id: RunId,
    /// Status observed when the cancellation was requested
    pub status: RunStatus,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub queue_id: QueueId,
    pub position: usize,
    pub estimated_wait_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct QueueEntryResponse {
    pub queue_id: QueueId,
    pub operation: QueueOperation,
    pub job_id: String,
    pub status: QueueStatus,
    pub position: usize,
    pub estimated_wait_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_runs: usize,
    pub max_concurrency: usize,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_service_status: Option<String>,
}
