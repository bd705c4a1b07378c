//! Account rows and their CRUD queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use sqlx::FromRow;

use simplebank_common::{AccountId, Currency};

use crate::error::{LedgerError, Result};

pub(crate) const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";

/// A ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    /// Unique account identifier.
    #[sqlx(try_from = "i64")]
    pub id: AccountId,
    /// Account owner name.
    pub owner: String,
    /// Balance in minor currency units.
    pub balance: i64,
    /// Account currency.
    #[sqlx(try_from = "String")]
    pub currency: Currency,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Input for [`AccountRepository::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: Currency,
}

/// Input for [`AccountRepository::update_balance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateAccountParams {
    pub id: AccountId,
    pub balance: i64,
}

/// Input for [`AccountRepository::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListAccountsParams {
    pub limit: i64,
    pub offset: i64,
}

/// Account queries. Each method is a single statement run on the given executor.
pub struct AccountRepository;

impl AccountRepository {
    /// Insert a new account.
    pub async fn create<'e, E>(executor: E, params: &CreateAccountParams) -> Result<Account>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO accounts (owner, balance, currency) VALUES ($1, $2, $3) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(&params.owner)
            .bind(params.balance)
            .bind(params.currency.code())
            .fetch_one(executor)
            .await?;

        Ok(account)
    }

    /// Get an account by id.
    pub async fn get<'e, E>(executor: E, id: AccountId) -> Result<Account>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, Account>(&sql)
            .bind(id.get())
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", id))
    }

    /// Replace an account's balance.
    ///
    /// Not used on the transfer path, which goes through
    /// [`BalanceAdjustment`](crate::balance::BalanceAdjustment) instead.
    pub async fn update_balance<'e, E>(executor: E, params: UpdateAccountParams) -> Result<Account>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "UPDATE accounts SET balance = $2 WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(params.id.get())
            .bind(params.balance)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", params.id))
    }

    /// Delete an account.
    pub async fn delete<'e, E>(executor: E, id: AccountId) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.get())
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found("account", id));
        }
        Ok(())
    }

    /// List accounts ordered by id.
    pub async fn list<'e, E>(executor: E, params: ListAccountsParams) -> Result<Vec<Account>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT {} FROM accounts ORDER BY id LIMIT $1 OFFSET $2",
            ACCOUNT_COLUMNS
        );
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(executor)
            .await?;

        Ok(accounts)
    }
}
