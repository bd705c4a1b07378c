//! Atomic balance adjustment.

use sqlx::postgres::PgExecutor;

use simplebank_common::AccountId;

use crate::account::{Account, ACCOUNT_COLUMNS};
use crate::error::{LedgerError, Result};

/// A relative change to one account's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceAdjustment {
    /// Account to adjust.
    pub account_id: AccountId,
    /// Signed delta in minor units.
    pub delta: i64,
}

impl BalanceAdjustment {
    /// Create a new adjustment.
    pub fn new(account_id: AccountId, delta: i64) -> Self {
        Self { account_id, delta }
    }

    /// Apply the adjustment and return the account row after it.
    ///
    /// The read and the write happen in one `UPDATE ... SET balance = balance + $1`
    /// statement. The engine's row lock on that update serializes concurrent
    /// adjustments to the same account, so no caller-side `SELECT ... FOR UPDATE`
    /// is needed and no update can be lost.
    pub async fn apply<'e, E>(self, executor: E) -> Result<Account>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "UPDATE accounts SET balance = balance + $1 WHERE id = $2 RETURNING {}",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(self.delta)
            .bind(self.account_id.get())
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", self.account_id))
    }
}

/// Add `delta` to an account's balance in a single statement.
pub async fn add_account_balance<'e, E>(
    executor: E,
    account_id: AccountId,
    delta: i64,
) -> Result<Account>
where
    E: PgExecutor<'e>,
{
    BalanceAdjustment::new(account_id, delta)
        .apply(executor)
        .await
}
