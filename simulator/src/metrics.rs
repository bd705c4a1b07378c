//! Simulation metrics.

use std::collections::VecDeque;

use serde::Serialize;

/// Simulation metrics.
#[derive(Debug, Clone)]
pub struct SimulationMetrics {
    /// Transfers attempted.
    pub total_transfers: u64,
    /// Transfers that eventually committed.
    pub committed_transfers: u64,
    /// Transfers that failed after all retries.
    pub failed_transfers: u64,
    /// Extra attempts spent on retryable failures.
    pub retries: u64,
    /// Latency samples (ms), retries included.
    latency_samples: VecDeque<u64>,
    /// Maximum samples to keep.
    max_samples: usize,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            total_transfers: 0,
            committed_transfers: 0,
            failed_transfers: 0,
            retries: 0,
            latency_samples: VecDeque::with_capacity(10000),
            max_samples: 10000,
        }
    }

    /// Record a committed transfer.
    pub fn record_success(&mut self, latency_ms: u64) {
        self.total_transfers += 1;
        self.committed_transfers += 1;

        if self.latency_samples.len() >= self.max_samples {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_ms);
    }

    /// Record a failed transfer.
    pub fn record_failure(&mut self) {
        self.total_transfers += 1;
        self.failed_transfers += 1;
    }

    /// Record retries spent on one transfer.
    pub fn record_retries(&mut self, retries: u32) {
        self.retries += u64::from(retries);
    }

    /// Get average latency in ms.
    pub fn average_latency_ms(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    /// Get p50 latency.
    pub fn p50_latency_ms(&self) -> u64 {
        self.percentile_latency(50)
    }

    /// Get p99 latency.
    pub fn p99_latency_ms(&self) -> u64 {
        self.percentile_latency(99)
    }

    fn percentile_latency(&self, percentile: usize) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let mut sorted: Vec<_> = self.latency_samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = (sorted.len() * percentile / 100).min(sorted.len() - 1);
        sorted[idx]
    }

    /// Get success rate.
    pub fn success_rate(&self) -> f64 {
        if self.total_transfers == 0 {
            return 0.0;
        }

        self.committed_transfers as f64 / self.total_transfers as f64
    }

    /// Get throughput (transfers per second).
    pub fn throughput(&self, elapsed_secs: f64) -> f64 {
        if elapsed_secs <= 0.0 {
            return 0.0;
        }

        self.total_transfers as f64 / elapsed_secs
    }

    /// Summarize for reporting.
    pub fn report(&self, elapsed_secs: f64) -> MetricsReport {
        MetricsReport {
            total: self.total_transfers,
            committed: self.committed_transfers,
            failed: self.failed_transfers,
            retries: self.retries,
            success_rate: self.success_rate(),
            throughput_per_sec: self.throughput(elapsed_secs),
            average_latency_ms: self.average_latency_ms(),
            p50_latency_ms: self.p50_latency_ms(),
            p99_latency_ms: self.p99_latency_ms(),
        }
    }
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable summary of a run.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub total: u64,
    pub committed: u64,
    pub failed: u64,
    pub retries: u64,
    pub success_rate: f64,
    pub throughput_per_sec: f64,
    pub average_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p99_latency_ms: u64,
}
