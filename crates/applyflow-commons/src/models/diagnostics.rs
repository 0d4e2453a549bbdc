//! Diagnostics snapshot models.
//!
//! A snapshot is a point-in-time, non-persisted aggregate recomputed on
//! every diagnostics request. The collaborating subsystems (circuit
//! breakers, rate limiters, credit-bearing API clients) expose narrow
//! read-only stats that the aggregator folds into these models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of an external API's credit/usage level, derived from
/// percentage-of-limit thresholds applied uniformly across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Healthy,
    Warning,
    Critical,
    Exhausted,
}

impl CreditStatus {
    /// `>= 100%` exhausted, `>= 90%` critical, `>= 80%` warning.
    pub fn classify(used: u64, limit: u64) -> Self {
        if limit == 0 || used >= limit {
            return CreditStatus::Exhausted;
        }
        let pct = used as f64 / limit as f64 * 100.0;
        if pct >= 90.0 {
            CreditStatus::Critical
        } else if pct >= 80.0 {
            CreditStatus::Warning
        } else {
            CreditStatus::Healthy
        }
    }
}

/// Credit/usage counters for one external provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditUsage {
    pub provider: String,
    pub used: u64,
    pub limit: u64,
    pub status: CreditStatus,
}

/// Probe result for one dependency connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyHealth {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Circuit-breaker tallies by state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CircuitTallies {
    pub closed: usize,
    pub open: usize,
    pub half_open: usize,
}

/// Rate-limiter counters for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCounters {
    pub provider: String,
    pub requests: u64,
    pub waits: u64,
}

/// Orchestrator capacity at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    pub active_runs: usize,
    pub max_concurrency: usize,
    pub queued_runs: usize,
    /// Sub-operation queue depth broken down by entry status
    pub queue_pending: usize,
    pub queue_running: usize,
}

/// A recent operational alert retained in a bounded window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEntry {
    pub at: DateTime<Utc>,
    pub severity: String,
    pub message: String,
}

/// Aggregated health report spanning dependencies, capacity, and
/// rate/circuit state. Never mutated between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub dependencies: Vec<DependencyHealth>,
    pub credits: Vec<CreditUsage>,
    pub circuit_breakers: CircuitTallies,
    pub rate_limiters: Vec<ProviderCounters>,
    pub capacity: CapacitySnapshot,
    pub recent_alerts: Vec<AlertEntry>,
    /// Process memory in MB, when the platform exposes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_thresholds() {
        assert_eq!(CreditStatus::classify(0, 100), CreditStatus::Healthy);
        assert_eq!(CreditStatus::classify(79, 100), CreditStatus::Healthy);
        assert_eq!(CreditStatus::classify(80, 100), CreditStatus::Warning);
        assert_eq!(CreditStatus::classify(89, 100), CreditStatus::Warning);
        assert_eq!(CreditStatus::classify(90, 100), CreditStatus::Critical);
        assert_eq!(CreditStatus::classify(99, 100), CreditStatus::Critical);
        assert_eq!(CreditStatus::classify(100, 100), CreditStatus::Exhausted);
    }

    #[test]
    fn zero_limit_counts_as_exhausted() {
        assert_eq!(CreditStatus::classify(0, 0), CreditStatus::Exhausted);
    }
}
