//! Read-only stats surfaces for diagnostics collaborators.
//!
//! Circuit breakers, rate limiters, and credit-bearing API clients live in
//! dependent subsystems; the aggregator only polls these narrow traits and
//! never folds their logic into the orchestrator.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use applyflow_commons::models::{AlertEntry, CircuitTallies, ProviderCounters};
use applyflow_store::JobStore;

/// Connection-health probe for one dependency.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    fn name(&self) -> &str;
    /// Err carries a human-readable failure description.
    async fn probe(&self) -> std::result::Result<(), String>;
}

/// Circuit-breaker tallies by state, summed by the aggregator.
pub trait CircuitBreakerStats: Send + Sync {
    fn tallies(&self) -> CircuitTallies;
}

/// Per-provider rate-limiter counters.
pub trait RateLimiterStats: Send + Sync {
    fn counters(&self) -> Vec<ProviderCounters>;
}

/// Per-provider credit/usage counters: `(provider, used, limit)`.
pub trait CreditStats: Send + Sync {
    fn usage(&self) -> Vec<(String, u64, u64)>;
}

/// Bounded window of recent operational alerts.
pub struct AlertLog {
    max_entries: usize,
    entries: Mutex<VecDeque<AlertEntry>>,
}

impl AlertLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, severity: &str, message: impl Into<String>) {
        let mut entries = self.entries.lock();
        if entries.len() == self.max_entries {
            entries.pop_front();
        }
        entries.push_back(AlertEntry {
            at: Utc::now(),
            severity: severity.to_string(),
            message: message.into(),
        });
    }

    pub fn recent(&self) -> Vec<AlertEntry> {
        self.entries.lock().iter().cloned().collect()
    }
}

/// Probe over the configured durable job store.
pub struct JobStoreProbe {
    store: Arc<dyn JobStore>,
}

impl JobStoreProbe {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DependencyProbe for JobStoreProbe {
    fn name(&self) -> &str {
        "job_store"
    }

    async fn probe(&self) -> std::result::Result<(), String> {
        self.store.ping().await.map_err(|e| e.to_string())
    }
}

/// TCP connect probe for network dependencies (e.g. the PDF render
/// service). A successful connect is treated as healthy.
pub struct TcpProbe {
    name: String,
    addr: String,
}

impl TcpProbe {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
        }
    }
}

#[async_trait]
impl DependencyProbe for TcpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> std::result::Result<(), String> {
        tokio::net::TcpStream::connect(&self.addr)
            .await
            .map(|_| ())
            .map_err(|e| format!("connect {}: {}", self.addr, e))
    }
}
