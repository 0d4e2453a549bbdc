//! Durable job-record store contract.
//!
//! The orchestrator treats the job table as an external collaborator and
//! talks to it only through [`JobStore`]: a single conditional update per
//! call, matched by job key, never an upsert. Two backends ship with the
//! workspace: an in-memory store for tests and a JSON-file store the server
//! uses when durable storage is configured.

pub mod jsonfile;
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};

use applyflow_commons::models::{JobKey, JobUpdate};
use applyflow_commons::Result;

pub use jsonfile::JsonFileJobStore;
pub use memory::InMemoryJobStore;

/// Outcome of a conditional job-record update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The record existed and was updated
    Applied,
    /// No record for the key; the write was a no-op
    Missing,
}

/// Narrow read/write contract over the durable job table.
///
/// Implementations must apply each update as one atomic operation per
/// record; the orchestrator never performs read-modify-write across calls.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Apply `update` to the record matched by `key`. Missing records are
    /// reported, not created.
    async fn update_job(&self, key: &JobKey, update: JobUpdate) -> Result<UpdateOutcome>;

    /// Fetch a record snapshot, mainly for tests and diagnostics.
    async fn get_job(&self, key: &JobKey) -> Result<Option<Map<String, Value>>>;

    /// Cheap liveness probe used by the diagnostics aggregator.
    async fn ping(&self) -> Result<()>;
}

/// Merge an update into a record's field map. Flags are plain boolean
/// fields that are only ever set to true.
pub(crate) fn apply_update(record: &mut Map<String, Value>, update: JobUpdate) {
    for (field, value) in update.fields {
        record.insert(field, value);
    }
    for flag in update.flags {
        record.insert(flag, Value::Bool(true));
    }
}
