//! Request bodies and query parameters.

use serde::Deserialize;

use applyflow_commons::models::{ProcessingTier, RunOptions};

/// Body of `POST /v1/jobs/run`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub job_id: String,
    #[serde(default)]
    pub profile_ref: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub processing_tier: Option<ProcessingTier>,
}

impl RunRequest {
    pub fn into_options(self) -> (String, RunOptions) {
        (
            self.job_id,
            RunOptions {
                profile_ref: self.profile_ref,
                source: self.source,
                processing_tier: self.processing_tier,
                ..RunOptions::default()
            },
        )
    }
}

/// Body of `POST /v1/jobs/run-bulk`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkRunRequest {
    pub job_ids: Vec<String>,
    #[serde(default)]
    pub profile_ref: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub processing_tier: Option<ProcessingTier>,
}

impl BulkRunRequest {
    pub fn into_options(self) -> (Vec<String>, RunOptions) {
        (
            self.job_ids,
            RunOptions {
                profile_ref: self.profile_ref,
                source: self.source,
                processing_tier: self.processing_tier,
                ..RunOptions::default()
            },
        )
    }
}

/// Body of `POST /v1/queue/{operation}`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueRequest {
    pub job_id: String,
    #[serde(default)]
    pub processing_tier: Option<ProcessingTier>,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub use_llm: bool,
    #[serde(default)]
    pub use_annotations: bool,
}

impl QueueRequest {
    pub fn into_options(self) -> (String, RunOptions) {
        (
            self.job_id,
            RunOptions {
                processing_tier: self.processing_tier,
                force_refresh: self.force_refresh,
                use_llm: self.use_llm,
                use_annotations: self.use_annotations,
                ..RunOptions::default()
            },
        )
    }
}

/// Query parameters of `GET /v1/jobs/{run_id}/logs`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsQuery {
    /// `false` returns the current buffer and closes instead of following
    #[serde(default = "default_follow")]
    pub follow: bool,
}

fn default_follow() -> bool {
    true
}
