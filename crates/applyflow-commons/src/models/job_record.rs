//! Narrow contract types for the durable job store.
//!
//! The orchestrator never owns the job table; it only updates existing
//! records through `JobUpdate`. Records are matched by `JobKey`, numeric
//! when the caller-supplied identifier parses as an integer, string
//! otherwise.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical key for a job record in the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobKey {
    Numeric(i64),
    Text(String),
}

impl JobKey {
    /// Parse a caller-supplied job identifier: numeric if convertible,
    /// string fallback otherwise.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => JobKey::Numeric(n),
            Err(_) => JobKey::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKey::Numeric(n) => write!(f, "{}", n),
            JobKey::Text(s) => f.write_str(s),
        }
    }
}

/// Field set for a single conditional job-record update.
///
/// Only the fields carried here are touched; everything else on the record
/// is left as-is. Boolean progress flags are only ever set to `true`, so
/// they are modeled as presence in `flags` rather than tri-state values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    /// Scalar fields written verbatim (`pipeline_run_id`, `pipeline_status`,
    /// timestamps, `artifact_urls`, and on completion the full state fields)
    pub fields: BTreeMap<String, Value>,
    /// Progress flags to set to true
    pub flags: Vec<String>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(field.into(), value);
        self
    }

    pub fn flag(&mut self, name: impl Into<String>) -> &mut Self {
        self.flags.push(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keys_parse() {
        assert_eq!(JobKey::from_raw("42"), JobKey::Numeric(42));
        assert_eq!(JobKey::from_raw(" 7 "), JobKey::Numeric(7));
    }

    #[test]
    fn non_numeric_keys_fall_back_to_text() {
        assert_eq!(JobKey::from_raw("rec_abc"), JobKey::Text("rec_abc".into()));
        assert_eq!(JobKey::from_raw("42b"), JobKey::Text("42b".into()));
    }

    #[test]
    fn update_builder_accumulates() {
        let mut update = JobUpdate::new();
        update.set("pipeline_status", Value::String("running".into()));
        update.flag("cv_generated");
        assert!(!update.is_empty());
        assert_eq!(update.fields.len(), 1);
        assert_eq!(update.flags, vec!["cv_generated".to_string()]);
    }
}
