//! Queued sub-operation models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named pipeline sub-operations that can be queued individually,
/// as opposed to a full pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueOperation {
    Extract,
    Research,
    GenerateCv,
    GenerateCoverLetter,
}

impl QueueOperation {
    /// Flag passed to the pipeline program to select the sub-operation.
    pub fn pipeline_flag(self) -> &'static str {
        match self {
            QueueOperation::Extract => "extract",
            QueueOperation::Research => "research",
            QueueOperation::GenerateCv => "generate-cv",
            QueueOperation::GenerateCoverLetter => "generate-cover-letter",
        }
    }

    /// Parse the URL path segment used by the queue endpoints.
    pub fn from_path_segment(s: &str) -> Option<Self> {
        match s {
            "extract" => Some(QueueOperation::Extract),
            "research" => Some(QueueOperation::Research),
            "generate-cv" | "generate_cv" => Some(QueueOperation::GenerateCv),
            "generate-cover-letter" | "generate_cover_letter" => {
                Some(QueueOperation::GenerateCoverLetter)
            }
            _ => None,
        }
    }
}

impl fmt::Display for QueueOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pipeline_flag())
    }
}

/// Status of a queue entry. Mirrors `RunStatus` plus `Pending` for entries
/// that have not yet been handed to the admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Failed)
    }
}
