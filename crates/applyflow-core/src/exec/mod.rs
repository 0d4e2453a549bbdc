//! Pipeline child-process supervision and output discovery.

pub mod artifacts;
pub mod handoff;

mod executor;

pub use executor::{ExecOutcome, PipelineSettings, ProcessExecutor};
