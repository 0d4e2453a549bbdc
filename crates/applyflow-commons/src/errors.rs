//! Shared error type for Applyflow operations.
//!
//! One enum for the whole orchestrator: admission rejections, execution
//! faults, storage problems, and configuration errors all map onto it.
//! HTTP handlers translate variants to status codes at the boundary.

use thiserror::Error;

/// Convenience alias used throughout the Applyflow crates.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Common error type for orchestrator operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invalid input provided by a caller (bad request shape, bad id)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found (run, queue entry, artifact, job record)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error detected at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure while supervising the pipeline child process
    #[error("Execution error: {0}")]
    Execution(String),

    /// Durable store failure (always swallowed by the persistence bridge)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unexpected internal state
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Short machine-readable kind, used in structured error log records.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::InvalidInput(_) => "invalid_input",
            OrchestratorError::NotFound(_) => "not_found",
            OrchestratorError::Configuration(_) => "configuration",
            OrchestratorError::Execution(_) => "execution",
            OrchestratorError::Storage(_) => "storage",
            OrchestratorError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for OrchestratorError {
    fn from(err: std::io::Error) -> Self {
        OrchestratorError::Execution(err.to_string())
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        OrchestratorError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(OrchestratorError::NotFound("run".into()).kind(), "not_found");
        assert_eq!(
            OrchestratorError::Execution("spawn failed".into()).kind(),
            "execution"
        );
    }

    #[test]
    fn display_includes_message() {
        let err = OrchestratorError::InvalidInput("job_id is required".into());
        assert_eq!(err.to_string(), "Invalid input: job_id is required");
    }
}
