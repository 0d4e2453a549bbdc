//! In-memory job store, used by unit and integration tests.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};

use applyflow_commons::models::{JobKey, JobUpdate};
use applyflow_commons::Result;

use crate::{apply_update, JobStore, UpdateOutcome};

/// DashMap-backed store. Updates lock one record at a time, so each call
/// is atomic per record.
#[derive(Default)]
pub struct InMemoryJobStore {
    records: DashMap<JobKey, Map<String, Value>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a job record; tests use this to simulate pre-existing jobs.
    pub fn seed(&self, key: JobKey, record: Map<String, Value>) {
        self.records.insert(key, record);
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn update_job(&self, key: &JobKey, update: JobUpdate) -> Result<UpdateOutcome> {
        match self.records.get_mut(key) {
            Some(mut record) => {
                apply_update(record.value_mut(), update);
                Ok(UpdateOutcome::Applied)
            }
            None => Ok(UpdateOutcome::Missing),
        }
    }

    async fn get_job(&self, key: &JobKey) -> Result<Option<Map<String, Value>>> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(field: &str, value: Value) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(field.to_string(), value);
        record
    }

    #[tokio::test]
    async fn update_missing_record_is_noop() {
        let store = InMemoryJobStore::new();
        let mut update = JobUpdate::new();
        update.set("pipeline_status", Value::String("running".into()));

        let outcome = store
            .update_job(&JobKey::Numeric(1), update)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Missing);
        assert!(store.get_job(&JobKey::Numeric(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_fields_and_flags() {
        let store = InMemoryJobStore::new();
        let key = JobKey::from_raw("42");
        store.seed(key.clone(), record_with("title", Value::String("Architect".into())));

        let mut update = JobUpdate::new();
        update.set("pipeline_status", Value::String("completed".into()));
        update.flag("cv_generated");
        let outcome = store.update_job(&key, update).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);

        let record = store.get_job(&key).await.unwrap().unwrap();
        assert_eq!(record["title"], Value::String("Architect".into()));
        assert_eq!(record["pipeline_status"], Value::String("completed".into()));
        assert_eq!(record["cv_generated"], Value::Bool(true));
    }
}
