//! Metrics collection for transfer monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::state::TransferPhase;

/// Transfer coordinator metrics.
pub struct Metrics {
    /// Transfers that opened a session.
    pub transfers_total: AtomicU64,
    /// Transfers committed.
    pub transfers_committed: AtomicU64,
    /// Transfers rolled back.
    pub transfers_rolled_back: AtomicU64,
    /// Transfers rejected before a session was opened.
    pub transfers_rejected: AtomicU64,
    /// Sessions currently open.
    pub transfers_active: AtomicU64,
    /// Rollbacks caused by a serialization failure or detected deadlock.
    pub retryable_failures: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            transfers_total: AtomicU64::new(0),
            transfers_committed: AtomicU64::new(0),
            transfers_rolled_back: AtomicU64::new(0),
            transfers_rejected: AtomicU64::new(0),
            transfers_active: AtomicU64::new(0),
            retryable_failures: AtomicU64::new(0),
        }
    }

    /// Record a session opened.
    pub fn transfer_initiated(&self) {
        self.transfers_total.fetch_add(1, Ordering::Relaxed);
        self.transfers_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the terminal phase of a session.
    pub fn transfer_finished(&self, phase: TransferPhase) {
        match phase {
            TransferPhase::Committed => {
                self.transfers_committed.fetch_add(1, Ordering::Relaxed);
            }
            TransferPhase::RolledBack => {
                self.transfers_rolled_back.fetch_add(1, Ordering::Relaxed);
            }
            TransferPhase::InProgress => return,
        }
        self.transfers_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a transfer rejected by validation.
    pub fn transfer_rejected(&self) {
        self.transfers_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retryable engine failure.
    pub fn retryable_failure(&self) {
        self.retryable_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            transfers_total: self.transfers_total.load(Ordering::Relaxed),
            transfers_committed: self.transfers_committed.load(Ordering::Relaxed),
            transfers_rolled_back: self.transfers_rolled_back.load(Ordering::Relaxed),
            transfers_rejected: self.transfers_rejected.load(Ordering::Relaxed),
            transfers_active: self.transfers_active.load(Ordering::Relaxed),
            retryable_failures: self.retryable_failures.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP simplebank_transfers_total Total number of transfer sessions opened
# TYPE simplebank_transfers_total counter
simplebank_transfers_total {}

# HELP simplebank_transfers_committed Total committed transfers
# TYPE simplebank_transfers_committed counter
simplebank_transfers_committed {}

# HELP simplebank_transfers_rolled_back Total rolled back transfers
# TYPE simplebank_transfers_rolled_back counter
simplebank_transfers_rolled_back {}

# HELP simplebank_transfers_rejected Total transfers rejected by validation
# TYPE simplebank_transfers_rejected counter
simplebank_transfers_rejected {}

# HELP simplebank_transfers_active Current open transfer sessions
# TYPE simplebank_transfers_active gauge
simplebank_transfers_active {}

# HELP simplebank_retryable_failures Total serialization failures and deadlocks
# TYPE simplebank_retryable_failures counter
simplebank_retryable_failures {}
"#,
            snapshot.transfers_total,
            snapshot.transfers_committed,
            snapshot.transfers_rolled_back,
            snapshot.transfers_rejected,
            snapshot.transfers_active,
            snapshot.retryable_failures,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub transfers_total: u64,
    pub transfers_committed: u64,
    pub transfers_rolled_back: u64,
    pub transfers_rejected: u64,
    pub transfers_active: u64,
    pub retryable_failures: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
