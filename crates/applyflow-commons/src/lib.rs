//! Shared vocabulary for the Applyflow orchestrator.
//!
//! Typed identifiers, run/queue/diagnostics models, and the common error
//! type used across all Applyflow crates. Keeping these in one leaf crate
//! avoids dependency cycles between the core, store, and API layers.

pub mod errors;
pub mod ids;
pub mod models;

pub use errors::{OrchestratorError, Result};
pub use ids::{QueueId, RunId};
