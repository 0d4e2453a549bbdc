//! On-demand diagnostics aggregation.
//!
//! Each request probes every registered dependency with a short timeout,
//! isolating failures per dependency: one unhealthy collaborator becomes
//! an unhealthy entry, never an error for the whole call. The snapshot is
//! recomputed every time and never mutated between requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sysinfo::System;

use applyflow_commons::models::{
    CapacitySnapshot, CircuitTallies, CreditStatus, CreditUsage, DependencyHealth,
    DiagnosticsSnapshot, ProviderCounters,
};

use crate::admission::OperationQueue;
use crate::runs::RunRegistry;

use super::stats::{AlertLog, CircuitBreakerStats, CreditStats, DependencyProbe, RateLimiterStats};

pub struct DiagnosticsAggregator {
    registry: Arc<RunRegistry>,
    queue: Arc<OperationQueue>,
    alerts: Arc<AlertLog>,
    max_concurrency: usize,
    probe_timeout: Duration,
    probes: Vec<Arc<dyn DependencyProbe>>,
    breakers: Vec<Arc<dyn CircuitBreakerStats>>,
    limiters: Vec<Arc<dyn RateLimiterStats>>,
    credits: Vec<Arc<dyn CreditStats>>,
}

impl DiagnosticsAggregator {
    pub fn new(
        registry: Arc<RunRegistry>,
        queue: Arc<OperationQueue>,
        alerts: Arc<AlertLog>,
        max_concurrency: usize,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            queue,
            alerts,
            max_concurrency,
            probe_timeout,
            probes: Vec::new(),
            breakers: Vec::new(),
            limiters: Vec::new(),
            credits: Vec::new(),
        }
    }

    pub fn register_probe(&mut self, probe: Arc<dyn DependencyProbe>) {
        self.probes.push(probe);
    }

    pub fn register_breaker(&mut self, breaker: Arc<dyn CircuitBreakerStats>) {
        self.breakers.push(breaker);
    }

    pub fn register_limiter(&mut self, limiter: Arc<dyn RateLimiterStats>) {
        self.limiters.push(limiter);
    }

    pub fn register_credits(&mut self, credits: Arc<dyn CreditStats>) {
        self.credits.push(credits);
    }

    pub fn alerts(&self) -> &Arc<AlertLog> {
        &self.alerts
    }

    /// Build a fresh snapshot.
    pub async fn collect(&self) -> DiagnosticsSnapshot {
        let mut dependencies = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            dependencies.push(self.probe_one(probe.as_ref()).await);
        }

        let credits = self
            .credits
            .iter()
            .flat_map(|source| source.usage())
            .map(|(provider, used, limit)| CreditUsage {
                status: CreditStatus::classify(used, limit),
                provider,
                used,
                limit,
            })
            .collect();

        let circuit_breakers = self.breakers.iter().map(|b| b.tallies()).fold(
            CircuitTallies::default(),
            |mut acc, t| {
                acc.closed += t.closed;
                acc.open += t.open;
                acc.half_open += t.half_open;
                acc
            },
        );

        let rate_limiters: Vec<ProviderCounters> = self
            .limiters
            .iter()
            .flat_map(|l| l.counters())
            .collect();

        let (queue_pending, queue_running) = self.queue.depth();
        let capacity = CapacitySnapshot {
            active_runs: self.registry.running_count(),
            max_concurrency: self.max_concurrency,
            queued_runs: self.registry.queued_count(),
            queue_pending,
            queue_running,
        };

        let (memory_mb, cpu_usage) = process_metrics();

        DiagnosticsSnapshot {
            timestamp: Utc::now(),
            dependencies,
            credits,
            circuit_breakers,
            rate_limiters,
            capacity,
            recent_alerts: self.alerts.recent(),
            memory_mb,
            cpu_usage,
        }
    }

    /// Probe one dependency, bounding it by the configured timeout and
    /// converting every failure mode into an unhealthy entry.
    async fn probe_one(&self, probe: &dyn DependencyProbe) -> DependencyHealth {
        let started = Instant::now();
        let result = tokio::time::timeout(self.probe_timeout, probe.probe()).await;
        let latency_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(Ok(())) => DependencyHealth {
                name: probe.name().to_string(),
                healthy: true,
                latency_ms: Some(latency_ms),
                error: None,
            },
            Ok(Err(error)) => DependencyHealth {
                name: probe.name().to_string(),
                healthy: false,
                latency_ms: Some(latency_ms),
                error: Some(error),
            },
            Err(_) => DependencyHealth {
                name: probe.name().to_string(),
                healthy: false,
                latency_ms: None,
                error: Some(format!(
                    "probe timed out after {}ms",
                    self.probe_timeout.as_millis()
                )),
            },
        }
    }
}

/// Process memory/CPU snapshot; `None` when the platform hides the
/// current process.
fn process_metrics() -> (Option<u64>, Option<f32>) {
    let mut sys = System::new_all();
    sys.refresh_all();
    let Ok(pid) = sysinfo::get_current_pid() else {
        return (None, None);
    };
    match sys.process(pid) {
        Some(proc) => (Some(proc.memory() / 1024 / 1024), Some(proc.cpu_usage())),
        None => (None, None),
    }
}
