//! Run lifecycle models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a supervised pipeline run.
///
/// Transitions are monotonic and one-directional:
/// `Queued -> Running -> {Completed | Failed}`. A terminal status is never
/// left; the registry refuses any other transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Whether this status is terminal (never exited once reached).
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Queued, RunStatus::Running)
                | (RunStatus::Queued, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing-tier hint forwarded to the pipeline program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingTier {
    Fast,
    #[default]
    Standard,
    Deep,
}

impl ProcessingTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingTier::Fast => "fast",
            ProcessingTier::Standard => "standard",
            ProcessingTier::Deep => "deep",
        }
    }
}

/// Caller-supplied options for a run or a queued sub-operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Applicant profile reference forwarded to the pipeline program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_ref: Option<String>,
    /// Originating source of the job record (board name, manual, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_tier: Option<ProcessingTier>,
    /// Re-run even when cached intermediate results exist
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub use_llm: bool,
    #[serde(default)]
    pub use_annotations: bool,
}
