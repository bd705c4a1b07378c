//! Transfer phase definitions.

use serde::{Deserialize, Serialize};

/// Phase of a single transfer call.
///
/// A transfer starts `InProgress` and ends either `Committed` or `RolledBack`;
/// there are no other transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferPhase {
    /// Session open, writes pending.
    InProgress,
    /// All writes are durable and visible.
    Committed,
    /// No write from this call is visible.
    RolledBack,
}

impl TransferPhase {
    /// Check if this is a final phase.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferPhase::InProgress)
    }

    /// Check whether moving to `next` is allowed.
    pub fn can_transition_to(&self, next: TransferPhase) -> bool {
        matches!(
            (self, next),
            (TransferPhase::InProgress, TransferPhase::Committed)
                | (TransferPhase::InProgress, TransferPhase::RolledBack)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(!TransferPhase::InProgress.is_terminal());
        assert!(TransferPhase::Committed.is_terminal());
        assert!(TransferPhase::RolledBack.is_terminal());
    }

    #[test]
    fn test_transitions() {
        use TransferPhase::*;

        assert!(InProgress.can_transition_to(Committed));
        assert!(InProgress.can_transition_to(RolledBack));
        assert!(!Committed.can_transition_to(RolledBack));
        assert!(!RolledBack.can_transition_to(InProgress));
    }
}
