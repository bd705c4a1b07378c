//! Balance-change entries.
//!
//! Entries are append-only: there is no update or delete query for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use sqlx::FromRow;

use simplebank_common::{AccountId, EntryId};

use crate::error::{LedgerError, Result};

const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at";

/// Type of entry, derived from the sign of its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Money left the account.
    Debit,
    /// Money arrived in the account.
    Credit,
}

/// A single immutable balance change on one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Entry {
    /// Unique entry ID.
    #[sqlx(try_from = "i64")]
    pub id: EntryId,
    /// Account affected.
    #[sqlx(try_from = "i64")]
    pub account_id: AccountId,
    /// Signed amount: negative for debits, positive for credits.
    pub amount: i64,
    /// When this entry was created.
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Get the entry type.
    pub fn entry_type(&self) -> EntryType {
        if self.amount < 0 {
            EntryType::Debit
        } else {
            EntryType::Credit
        }
    }
}

/// Input for [`EntryRepository::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateEntryParams {
    pub account_id: AccountId,
    pub amount: i64,
}

/// Input for [`EntryRepository::list_for_account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntriesParams {
    pub account_id: AccountId,
    pub limit: i64,
    pub offset: i64,
}

/// Entry queries.
pub struct EntryRepository;

impl EntryRepository {
    /// Append an entry. A missing account surfaces as `NotFound`.
    pub async fn create<'e, E>(executor: E, params: CreateEntryParams) -> Result<Entry>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO entries (account_id, amount) VALUES ($1, $2) RETURNING {}",
            ENTRY_COLUMNS
        );
        sqlx::query_as::<_, Entry>(&sql)
            .bind(params.account_id.get())
            .bind(params.amount)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                LedgerError::from(e)
                    .foreign_key("account_id", "account", params.account_id)
            })
    }

    /// Get an entry by id.
    pub async fn get<'e, E>(executor: E, id: EntryId) -> Result<Entry>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {} FROM entries WHERE id = $1", ENTRY_COLUMNS);
        sqlx::query_as::<_, Entry>(&sql)
            .bind(id.get())
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| LedgerError::not_found("entry", id))
    }

    /// List an account's entries ordered by id.
    pub async fn list_for_account<'e, E>(
        executor: E,
        params: ListEntriesParams,
    ) -> Result<Vec<Entry>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT {} FROM entries WHERE account_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            ENTRY_COLUMNS
        );
        let entries = sqlx::query_as::<_, Entry>(&sql)
            .bind(params.account_id.get())
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(executor)
            .await?;

        Ok(entries)
    }

    /// Sum of all entry amounts recorded against an account.
    pub async fn total_for_account<'e, E>(executor: E, account_id: AccountId) -> Result<i64>
    where
        E: PgExecutor<'e>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM entries WHERE account_id = $1",
        )
        .bind(account_id.get())
        .fetch_one(executor)
        .await?;

        Ok(total)
    }
}
