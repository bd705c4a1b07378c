//! SimpleBank Common Types
//!
//! This crate contains types shared by the ledger, the transfer coordinator
//! and the simulator: entity identifiers, currency codes, and random test-data
//! generators.

pub mod identifiers;
pub mod monetary;
pub mod random;

pub use identifiers::*;
pub use monetary::*;
