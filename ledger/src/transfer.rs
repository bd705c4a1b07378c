//! Transfer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use sqlx::FromRow;

use simplebank_common::{AccountId, TransferId};

use crate::error::{LedgerError, Result};

const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at";

/// One recorded movement of funds between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Transfer {
    #[sqlx(try_from = "i64")]
    pub id: TransferId,
    #[sqlx(try_from = "i64")]
    pub from_account_id: AccountId,
    #[sqlx(try_from = "i64")]
    pub to_account_id: AccountId,
    /// Always positive.
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for [`TransferRepository::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
}

/// Input for [`TransferRepository::list_between`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTransfersParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub limit: i64,
    pub offset: i64,
}

/// Transfer queries.
pub struct TransferRepository;

impl TransferRepository {
    /// Insert a transfer record. A missing account surfaces as `NotFound`.
    pub async fn create<'e, E>(executor: E, params: CreateTransferParams) -> Result<Transfer>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO transfers (from_account_id, to_account_id, amount) \
             VALUES ($1, $2, $3) RETURNING {}",
            TRANSFER_COLUMNS
        );
        sqlx::query_as::<_, Transfer>(&sql)
            .bind(params.from_account_id.get())
            .bind(params.to_account_id.get())
            .bind(params.amount)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                LedgerError::from(e)
                    .foreign_key("from_account_id", "account", params.from_account_id)
                    .foreign_key("to_account_id", "account", params.to_account_id)
            })
    }

    /// Get a transfer by id.
    pub async fn get<'e, E>(executor: E, id: TransferId) -> Result<Transfer>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {} FROM transfers WHERE id = $1", TRANSFER_COLUMNS);
        sqlx::query_as::<_, Transfer>(&sql)
            .bind(id.get())
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| LedgerError::not_found("transfer", id))
    }

    /// List transfers in either direction between two accounts, ordered by id.
    pub async fn list_between<'e, E>(
        executor: E,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT {} FROM transfers \
             WHERE (from_account_id = $1 AND to_account_id = $2) \
                OR (from_account_id = $2 AND to_account_id = $1) \
             ORDER BY id LIMIT $3 OFFSET $4",
            TRANSFER_COLUMNS
        );
        let transfers = sqlx::query_as::<_, Transfer>(&sql)
            .bind(params.from_account_id.get())
            .bind(params.to_account_id.get())
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(executor)
            .await?;

        Ok(transfers)
    }
}
