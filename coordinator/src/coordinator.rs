//! Transactional transfer coordinator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnection;
use tracing::{debug, info, instrument, warn};

use simplebank_common::AccountId;
use simplebank_ledger::{
    Account, BalanceAdjustment, CreateEntryParams, CreateTransferParams, Entry, EntryRepository,
    LedgerError, Result, Store, Transfer, TransferRepository,
};

use crate::metrics::{Metrics, SharedMetrics};
use crate::state::TransferPhase;

/// A request to move `amount` from one account to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    /// Account to debit.
    pub from_account_id: AccountId,
    /// Account to credit.
    pub to_account_id: AccountId,
    /// Amount in minor units.
    pub amount: i64,
}

impl TransferParams {
    /// Create new transfer parameters.
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Reject malformed requests before any session is opened.
    ///
    /// The source balance is deliberately not checked: a transfer may overdraw.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= 0 {
            return Err(LedgerError::invalid_argument(
                "amount",
                format!("amount must be positive, got {}", self.amount),
            ));
        }

        if !self.from_account_id.is_valid() {
            return Err(LedgerError::invalid_argument(
                "from_account_id",
                format!("invalid account id {}", self.from_account_id),
            ));
        }

        if !self.to_account_id.is_valid() {
            return Err(LedgerError::invalid_argument(
                "to_account_id",
                format!("invalid account id {}", self.to_account_id),
            ));
        }

        if self.from_account_id == self.to_account_id {
            return Err(LedgerError::invalid_argument(
                "to_account_id",
                "source and destination accounts must differ",
            ));
        }

        Ok(())
    }
}

/// Everything one committed transfer wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    /// The transfer record.
    pub transfer: Transfer,
    /// Debit entry on the source account (`-amount`).
    pub from_entry: Entry,
    /// Credit entry on the destination account (`+amount`).
    pub to_entry: Entry,
    /// Source account after the debit.
    pub from_account: Account,
    /// Destination account after the credit.
    pub to_account: Account,
}

/// The two balance adjustments of a transfer, lower account id first.
///
/// Every session touching the same pair of rows requests their locks in the
/// same order, whatever the transfer direction, so two sessions can never each
/// hold the row the other is waiting for.
pub fn adjustment_order(params: &TransferParams) -> [BalanceAdjustment; 2] {
    let debit = BalanceAdjustment::new(params.from_account_id, -params.amount);
    let credit = BalanceAdjustment::new(params.to_account_id, params.amount);

    if params.from_account_id < params.to_account_id {
        [debit, credit]
    } else {
        [credit, debit]
    }
}

/// Map results produced in adjustment order back onto `(from, to)` roles.
fn by_role<T>(params: &TransferParams, first_adjusted: AccountId, first: T, second: T) -> (T, T) {
    if first_adjusted == params.from_account_id {
        (first, second)
    } else {
        (second, first)
    }
}

/// Tracks one open session and records its terminal phase exactly once.
///
/// If the transfer future is dropped mid-session the guard records a rollback,
/// matching what the engine does with the abandoned transaction.
struct SessionGuard<'a> {
    metrics: &'a Metrics,
    phase: TransferPhase,
}

impl<'a> SessionGuard<'a> {
    fn open(metrics: &'a Metrics) -> Self {
        metrics.transfer_initiated();
        Self {
            metrics,
            phase: TransferPhase::InProgress,
        }
    }

    fn finish(&mut self, phase: TransferPhase) {
        if self.phase.can_transition_to(phase) {
            self.phase = phase;
            self.metrics.transfer_finished(phase);
        }
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.finish(TransferPhase::RolledBack);
    }
}

/// Executes transfers as single atomic sessions.
///
/// Cloning is cheap: clones share the connection pool and metrics.
#[derive(Clone)]
pub struct TransferCoordinator {
    store: Store,
    metrics: SharedMetrics,
}

impl TransferCoordinator {
    /// Create a coordinator with fresh metrics.
    pub fn new(store: Store) -> Self {
        Self::with_metrics(store, Arc::new(Metrics::new()))
    }

    /// Create a coordinator reporting into existing metrics.
    pub fn with_metrics(store: Store, metrics: SharedMetrics) -> Self {
        Self { store, metrics }
    }

    /// Get the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Get the coordinator metrics.
    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Move `params.amount` from one account to another.
    ///
    /// Creates the transfer record and both entries, then adjusts both balances,
    /// all in one transaction. Any failure rolls the whole session back. The
    /// call is not retried here; callers decide on
    /// [`LedgerError::is_retryable`].
    #[instrument(
        skip(self, params),
        fields(
            from = %params.from_account_id,
            to = %params.to_account_id,
            amount = params.amount
        )
    )]
    pub async fn transfer(&self, params: TransferParams) -> Result<TransferResult> {
        if let Err(err) = params.validate() {
            self.metrics.transfer_rejected();
            warn!(error = %err, "Transfer rejected");
            return Err(err);
        }

        let mut session = SessionGuard::open(&self.metrics);
        let outcome = self
            .store
            .exec_tx(move |conn| Box::pin(execute_transfer(conn, params)))
            .await;

        match &outcome {
            Ok(result) => {
                session.finish(TransferPhase::Committed);
                info!(
                    transfer_id = %result.transfer.id,
                    from_balance = result.from_account.balance,
                    to_balance = result.to_account.balance,
                    "Transfer committed"
                );
            }
            Err(err) => {
                session.finish(TransferPhase::RolledBack);
                if err.is_retryable() {
                    self.metrics.retryable_failure();
                }
                warn!(
                    error = %err,
                    code = err.error_code(),
                    retryable = err.is_retryable(),
                    "Transfer rolled back"
                );
            }
        }

        outcome
    }
}

/// The five writes of one transfer, run on the session's connection.
async fn execute_transfer(
    conn: &mut PgConnection,
    params: TransferParams,
) -> Result<TransferResult> {
    let transfer = TransferRepository::create(
        &mut *conn,
        CreateTransferParams {
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
        },
    )
    .await?;

    let from_entry = EntryRepository::create(
        &mut *conn,
        CreateEntryParams {
            account_id: params.from_account_id,
            amount: -params.amount,
        },
    )
    .await?;

    let to_entry = EntryRepository::create(
        &mut *conn,
        CreateEntryParams {
            account_id: params.to_account_id,
            amount: params.amount,
        },
    )
    .await?;

    let [first, second] = adjustment_order(&params);
    let first_account = first.apply(&mut *conn).await?;
    let second_account = second.apply(&mut *conn).await?;
    debug!(
        first = %first.account_id,
        second = %second.account_id,
        "Balances adjusted"
    );

    let (from_account, to_account) =
        by_role(&params, first.account_id, first_account, second_account);

    Ok(TransferResult {
        transfer,
        from_entry,
        to_entry,
        from_account,
        to_account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(from: i64, to: i64, amount: i64) -> TransferParams {
        TransferParams::new(AccountId::new(from), AccountId::new(to), amount)
    }

    #[test]
    fn test_validate_accepts_positive_amount() {
        assert!(params(1, 2, 10).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let cases = [
            (params(1, 2, 0), "amount"),
            (params(1, 2, -5), "amount"),
            (params(0, 2, 10), "from_account_id"),
            (params(1, -1, 10), "to_account_id"),
            (params(4, 4, 10), "to_account_id"),
        ];

        for (request, expected_field) in cases {
            match request.validate() {
                Err(LedgerError::InvalidArgument { field, .. }) => {
                    assert_eq!(field, Some(expected_field), "{:?}", request)
                }
                other => panic!(
                    "expected InvalidArgument for {:?}, got {:?}",
                    request, other
                ),
            }
        }
    }

    #[test]
    fn test_lower_source_is_debited_first() {
        let [first, second] = adjustment_order(&params(3, 8, 10));

        assert_eq!(first, BalanceAdjustment::new(AccountId::new(3), -10));
        assert_eq!(second, BalanceAdjustment::new(AccountId::new(8), 10));
    }

    #[test]
    fn test_lower_destination_is_credited_first() {
        let [first, second] = adjustment_order(&params(8, 3, 10));

        assert_eq!(first, BalanceAdjustment::new(AccountId::new(3), 10));
        assert_eq!(second, BalanceAdjustment::new(AccountId::new(8), -10));
    }

    #[test]
    fn test_results_map_back_to_roles() {
        let forward = params(3, 8, 10);
        assert_eq!(
            by_role(&forward, AccountId::new(3), "a3", "a8"),
            ("a3", "a8")
        );

        let backward = params(8, 3, 10);
        assert_eq!(
            by_role(&backward, AccountId::new(3), "a3", "a8"),
            ("a8", "a3")
        );
    }

    proptest! {
        #[test]
        fn prop_adjustments_ascend_and_balance(
            from in 1i64..1_000_000,
            to in 1i64..1_000_000,
            amount in 1i64..1_000_000_000,
        ) {
            prop_assume!(from != to);
            let request = params(from, to, amount);
            let [first, second] = adjustment_order(&request);

            prop_assert!(first.account_id < second.account_id);
            prop_assert_eq!(first.delta + second.delta, 0);

            let debit = if first.delta < 0 { first } else { second };
            prop_assert_eq!(debit.account_id, request.from_account_id);
            prop_assert_eq!(debit.delta, -amount);
        }

        #[test]
        fn prop_opposite_directions_lock_in_same_order(
            a in 1i64..1_000_000,
            b in 1i64..1_000_000,
            amount in 1i64..1_000_000,
        ) {
            prop_assume!(a != b);
            let [ab_first, ab_second] = adjustment_order(&params(a, b, amount));
            let [ba_first, ba_second] = adjustment_order(&params(b, a, amount));

            prop_assert_eq!(ab_first.account_id, ba_first.account_id);
            prop_assert_eq!(ab_second.account_id, ba_second.account_id);
        }
    }
}
