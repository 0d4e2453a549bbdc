//! JSON-file-backed job store.
//!
//! One JSON object per file, keyed by the canonical job key string. Small
//! deployments run the whole job table out of this file; each update
//! rewrites the file through a temp-file rename so readers never observe a
//! torn document.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::warn;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use applyflow_commons::models::{JobKey, JobUpdate};
use applyflow_commons::{OrchestratorError, Result};

use crate::{apply_update, JobStore, UpdateOutcome};

pub struct JsonFileJobStore {
    path: PathBuf,
    records: Mutex<Map<String, Value>>,
}

impl JsonFileJobStore {
    /// Open (or create) the store file. A missing file starts empty; a
    /// malformed file is a hard error so corruption is caught at startup.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<Map<String, Value>>(&content)
                .map_err(|e| {
                    OrchestratorError::Storage(format!(
                        "Job store file {} is not a JSON object: {}",
                        path.display(),
                        e
                    ))
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                return Err(OrchestratorError::Storage(format!(
                    "Failed to read job store file {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    fn flush_locked(&self, records: &Map<String, Value>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        write_atomic(&tmp, &self.path, &serialized)
            .map_err(|e| OrchestratorError::Storage(format!("Job store write failed: {}", e)))
    }
}

fn write_atomic(tmp: &Path, dest: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(tmp, content)?;
    fs::rename(tmp, dest)
}

#[async_trait]
impl JobStore for JsonFileJobStore {
    async fn update_job(&self, key: &JobKey, update: JobUpdate) -> Result<UpdateOutcome> {
        let mut records = self.records.lock();
        let canonical = key.to_string();
        let Some(existing) = records.get_mut(&canonical) else {
            return Ok(UpdateOutcome::Missing);
        };
        let Some(record) = existing.as_object_mut() else {
            warn!("Job record '{}' is not an object; skipping update", canonical);
            return Ok(UpdateOutcome::Missing);
        };
        apply_update(record, update);
        self.flush_locked(&records)?;
        Ok(UpdateOutcome::Applied)
    }

    async fn get_job(&self, key: &JobKey) -> Result<Option<Map<String, Value>>> {
        let records = self.records.lock();
        Ok(records
            .get(&key.to_string())
            .and_then(|v| v.as_object())
            .cloned())
    }

    async fn ping(&self) -> Result<()> {
        // Liveness means the backing directory is still reachable
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::metadata(parent).map_err(|e| {
                    OrchestratorError::Storage(format!("Job store directory unreachable: {}", e))
                })?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(&path, r#"{"42": {"title": "Architect"}}"#).unwrap();

        let store = JsonFileJobStore::open(&path).unwrap();
        let mut update = JobUpdate::new();
        update.set("pipeline_status", Value::String("completed".into()));
        assert_eq!(
            store.update_job(&JobKey::Numeric(42), update).await.unwrap(),
            UpdateOutcome::Applied
        );
        drop(store);

        let reopened = JsonFileJobStore::open(&path).unwrap();
        let record = reopened.get_job(&JobKey::Numeric(42)).await.unwrap().unwrap();
        assert_eq!(record["pipeline_status"], Value::String("completed".into()));
        assert_eq!(record["title"], Value::String("Architect".into()));
    }

    #[tokio::test]
    async fn missing_file_starts_empty_and_missing_record_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileJobStore::open(dir.path().join("jobs.json")).unwrap();
        let outcome = store
            .update_job(&JobKey::from_raw("7"), JobUpdate::new())
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Missing);
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(&path, "not json").unwrap();
        assert!(JsonFileJobStore::open(&path).is_err());
    }
}
