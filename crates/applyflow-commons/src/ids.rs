//! Type-safe wrappers for orchestrator identifiers.
//!
//! Run and queue identifiers are generated by the orchestrator and travel
//! through URLs and filenames (the state-handoff file is keyed by run id),
//! so both wrappers validate against path-traversal characters.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for identifier validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdValidationError(pub String);

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IdValidationError {}

fn validate_id(id: &str, what: &str) -> std::result::Result<(), IdValidationError> {
    if id.is_empty() {
        return Err(IdValidationError(format!("{} cannot be empty", what)));
    }
    if id.contains("..") {
        return Err(IdValidationError(format!(
            "{} cannot contain '..' (path traversal)",
            what
        )));
    }
    if id.contains('/') || id.contains('\\') {
        return Err(IdValidationError(format!(
            "{} cannot contain directory separators",
            what
        )));
    }
    if id.contains('\0') || id.chars().any(char::is_whitespace) {
        return Err(IdValidationError(format!(
            "{} cannot contain whitespace or null bytes",
            what
        )));
    }
    Ok(())
}

/// Type-safe wrapper for run identifiers.
///
/// Opaque, unique, generated at admission time. Used as the registry key,
/// in status/log URLs, and as the state-handoff filename key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh run identifier (`run_<uuid>`).
    pub fn generate() -> Self {
        Self(format!("run_{}", Uuid::new_v4().simple()))
    }

    /// Wrap an existing identifier, validating it for safe use in paths.
    pub fn try_new(id: impl Into<String>) -> std::result::Result<Self, IdValidationError> {
        let id = id.into();
        validate_id(&id, "Run ID")?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe wrapper for queue-entry identifiers (`q_<uuid>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueId(String);

impl QueueId {
    pub fn generate() -> Self {
        Self(format!("q_{}", Uuid::new_v4().simple()))
    }

    pub fn try_new(id: impl Into<String>) -> std::result::Result<Self, IdValidationError> {
        let id = id.into();
        validate_id(&id, "Queue ID")?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_run_ids_are_unique_and_prefixed() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("run_"));
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(RunId::try_new("../etc/passwd").is_err());
        assert!(RunId::try_new("run/1").is_err());
        assert!(QueueId::try_new("q 1").is_err());
        assert!(RunId::try_new("").is_err());
    }

    #[test]
    fn accepts_plain_ids() {
        assert!(RunId::try_new("run_abc123").is_ok());
        assert!(QueueId::try_new("q_abc123").is_ok());
    }
}
