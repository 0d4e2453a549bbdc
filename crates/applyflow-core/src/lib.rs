//! Applyflow orchestration core.
//!
//! Everything between the HTTP boundary and the pipeline child process:
//! the in-memory run registry, the bounded-concurrency admission
//! controller, the process executor, artifact discovery, the persistence
//! bridge, and the diagnostics aggregator. Components receive their
//! dependencies through [`app_context::AppContext`], constructed once at
//! startup.

pub mod admission;
pub mod app_context;
pub mod diagnostics;
pub mod exec;
pub mod notify;
pub mod persist;
pub mod runs;

pub use app_context::AppContext;
