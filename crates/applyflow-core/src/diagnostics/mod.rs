//! Diagnostics: dependency probes, collaborator stats, and the on-demand
//! aggregator.

mod aggregator;
mod stats;

pub use aggregator::DiagnosticsAggregator;
pub use stats::{
    AlertLog, CircuitBreakerStats, CreditStats, DependencyProbe, JobStoreProbe, RateLimiterStats,
    TcpProbe,
};
