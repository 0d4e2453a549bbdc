//! Data models shared across Applyflow crates.

pub mod diagnostics;
pub mod job_record;
pub mod queue;
pub mod run;

pub use diagnostics::{
    AlertEntry, CapacitySnapshot, CircuitTallies, CreditStatus, CreditUsage, DependencyHealth,
    DiagnosticsSnapshot, ProviderCounters,
};
pub use job_record::{JobKey, JobUpdate};
pub use queue::{QueueOperation, QueueStatus};
pub use run::{ProcessingTier, RunOptions, RunStatus};
