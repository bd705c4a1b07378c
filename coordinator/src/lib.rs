//! SimpleBank Transfer Coordinator
//!
//! Moves money between two accounts as one atomic database session: a transfer
//! record, a debit and a credit entry, and both balance adjustments either all
//! commit or none do. Balance rows are always adjusted in ascending account-id
//! order so concurrent transfers over the same pair cannot deadlock.

pub mod config;
pub mod coordinator;
pub mod metrics;
pub mod state;


pub use config::{CoordinatorConfig, LogFormat};
pub use coordinator::{adjustment_order, TransferCoordinator, TransferParams, TransferResult};
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
pub use state::TransferPhase;
