//! Integration tests for the ledger store.
//!
//! These run against a live PostgreSQL instance reachable through `DATABASE_URL`.

use std::time::Duration;

use chrono::Utc;
use simplebank_common::random::{random_currency, random_money, random_owner};
use simplebank_common::{AccountId, EntryId, TransferId};

use crate::{
    add_account_balance, Account, AccountRepository, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, EntryRepository, LedgerError, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Result, Store, StoreConfig, TransferRepository, UpdateAccountParams,
};

/// An id no sequence will reach during a test run.
const MISSING_ID: i64 = i64::MAX - 1;

async fn create_test_store() -> Store {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| StoreConfig::default().database_url);
    let config = StoreConfig {
        database_url,
        ..StoreConfig::default()
    };

    let store = Store::connect(&config)
        .await
        .expect("Failed to connect to test database");
    store.ensure_schema().await.expect("Failed to create schema");
    store
}

fn random_account_params() -> CreateAccountParams {
    let mut rng = rand::thread_rng();
    CreateAccountParams {
        owner: random_owner(&mut rng),
        balance: random_money(&mut rng),
        currency: random_currency(&mut rng),
    }
}

async fn create_random_account(store: &Store) -> Account {
    let params = random_account_params();
    let account = AccountRepository::create(store.pool(), &params)
        .await
        .unwrap();

    assert!(account.id.is_valid());
    assert_eq!(account.owner, params.owner);
    assert_eq!(account.balance, params.balance);
    assert_eq!(account.currency, params.currency);
    let latest = Utc::now() + chrono::Duration::seconds(2);
    assert!(account.created_at <= latest);
    account
}

// ========================================================================
// Accounts
// ========================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_create_and_get_account() {
    let store = create_test_store().await;
    let created = create_random_account(&store).await;

    let fetched = AccountRepository::get(store.pool(), created.id)
        .await
        .unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.owner, created.owner);
    assert_eq!(fetched.balance, created.balance);
    assert_eq!(fetched.currency, created.currency);
    let drift = fetched.created_at - created.created_at;
    assert!(drift.num_seconds().abs() <= 2);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_update_account_balance() {
    let store = create_test_store().await;
    let account = create_random_account(&store).await;

    let updated = AccountRepository::update_balance(
        store.pool(),
        UpdateAccountParams {
            id: account.id,
            balance: account.balance + 250,
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.id, account.id);
    assert_eq!(updated.balance, account.balance + 250);
    assert_eq!(updated.owner, account.owner);
    assert_eq!(updated.currency, account.currency);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_delete_account() {
    let store = create_test_store().await;
    let account = create_random_account(&store).await;

    AccountRepository::delete(store.pool(), account.id)
        .await
        .unwrap();

    let err = AccountRepository::get(store.pool(), account.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "account", .. }));

    let err = AccountRepository::delete(store.pool(), account.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_list_accounts() {
    let store = create_test_store().await;
    for _ in 0..10 {
        create_random_account(&store).await;
    }

    let accounts = AccountRepository::list(
        store.pool(),
        ListAccountsParams {
            limit: 5,
            offset: 5,
        },
    )
    .await
    .unwrap();

    assert_eq!(accounts.len(), 5);
    assert!(accounts.windows(2).all(|pair| pair[0].id < pair[1].id));
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_update_missing_account() {
    let store = create_test_store().await;

    let err = AccountRepository::update_balance(
        store.pool(),
        UpdateAccountParams {
            id: AccountId::new(MISSING_ID),
            balance: 1,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, LedgerError::NotFound { id: MISSING_ID, .. }));
}

// ========================================================================
// Entries and transfers
// ========================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_create_and_get_entry() {
    let store = create_test_store().await;
    let account = create_random_account(&store).await;

    let entry = EntryRepository::create(
        store.pool(),
        CreateEntryParams {
            account_id: account.id,
            amount: -42,
        },
    )
    .await
    .unwrap();
    assert!(entry.id.is_valid());
    assert_eq!(entry.account_id, account.id);
    assert_eq!(entry.amount, -42);

    let fetched = EntryRepository::get(store.pool(), entry.id).await.unwrap();
    assert_eq!(fetched, entry);

    let listed = EntryRepository::list_for_account(
        store.pool(),
        ListEntriesParams {
            account_id: account.id,
            limit: 10,
            offset: 0,
        },
    )
    .await
    .unwrap();
    assert_eq!(listed, vec![entry]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_entry_for_missing_account() {
    let store = create_test_store().await;

    let err = EntryRepository::create(
        store.pool(),
        CreateEntryParams {
            account_id: AccountId::new(MISSING_ID),
            amount: 10,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::NotFound {
            entity: "account",
            id: MISSING_ID
        }
    ));

    let err = EntryRepository::get(store.pool(), EntryId::new(MISSING_ID))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "entry", .. }));
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_create_and_get_transfer() {
    let store = create_test_store().await;
    let from = create_random_account(&store).await;
    let to = create_random_account(&store).await;

    let transfer = TransferRepository::create(
        store.pool(),
        CreateTransferParams {
            from_account_id: from.id,
            to_account_id: to.id,
            amount: 17,
        },
    )
    .await
    .unwrap();
    assert_eq!(transfer.from_account_id, from.id);
    assert_eq!(transfer.to_account_id, to.id);
    assert_eq!(transfer.amount, 17);

    let fetched = TransferRepository::get(store.pool(), transfer.id)
        .await
        .unwrap();
    assert_eq!(fetched, transfer);

    // Listing is direction-agnostic.
    let listed = TransferRepository::list_between(
        store.pool(),
        ListTransfersParams {
            from_account_id: to.id,
            to_account_id: from.id,
            limit: 10,
            offset: 0,
        },
    )
    .await
    .unwrap();
    assert_eq!(listed, vec![transfer]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_transfer_to_missing_account() {
    let store = create_test_store().await;
    let from = create_random_account(&store).await;

    let err = TransferRepository::create(
        store.pool(),
        CreateTransferParams {
            from_account_id: from.id,
            to_account_id: AccountId::new(MISSING_ID),
            amount: 5,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::NotFound {
            entity: "account",
            id: MISSING_ID
        }
    ));

    let err = TransferRepository::get(store.pool(), TransferId::new(MISSING_ID))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "transfer", .. }));
}

// ========================================================================
// Balance adjustment
// ========================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_add_account_balance() {
    let store = create_test_store().await;
    let account = create_random_account(&store).await;

    let updated = add_account_balance(store.pool(), account.id, -1500)
        .await
        .unwrap();
    assert_eq!(updated.balance, account.balance - 1500);

    let err = add_account_balance(store.pool(), AccountId::new(MISSING_ID), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires PostgreSQL database"]
async fn test_concurrent_adjustments_lose_no_updates() {
    let store = create_test_store().await;
    let account = create_random_account(&store).await;
    let account_id = account.id;
    let n = 20;

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { add_account_balance(store.pool(), account_id, 3).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let fetched = AccountRepository::get(store.pool(), account.id)
        .await
        .unwrap();
    assert_eq!(fetched.balance, account.balance + 3 * n);
}

// ========================================================================
// Sessions
// ========================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_failed_session_leaves_no_rows() {
    let store = create_test_store().await;
    let from = create_random_account(&store).await;
    let to = create_random_account(&store).await;
    let (from_id, to_id) = (from.id, to.id);

    let outcome: Result<()> = store
        .exec_tx(move |conn| {
            Box::pin(async move {
                TransferRepository::create(
                    &mut *conn,
                    CreateTransferParams {
                        from_account_id: from_id,
                        to_account_id: to_id,
                        amount: 10,
                    },
                )
                .await?;
                EntryRepository::create(
                    &mut *conn,
                    CreateEntryParams {
                        account_id: from_id,
                        amount: -10,
                    },
                )
                .await?;
                Err(LedgerError::invalid_argument("session", "forced failure"))
            })
        })
        .await;

    assert!(matches!(outcome, Err(LedgerError::InvalidArgument { .. })));

    let transfers = TransferRepository::list_between(
        store.pool(),
        ListTransfersParams {
            from_account_id: from.id,
            to_account_id: to.id,
            limit: 10,
            offset: 0,
        },
    )
    .await
    .unwrap();
    assert!(transfers.is_empty());
    assert_eq!(
        EntryRepository::total_for_account(store.pool(), from.id)
            .await
            .unwrap(),
        0
    );
    let fetched = AccountRepository::get(store.pool(), from.id)
        .await
        .unwrap();
    assert_eq!(fetched.balance, from.balance);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_committed_session_is_visible() {
    let store = create_test_store().await;
    let account = create_random_account(&store).await;
    let account_id = account.id;

    let entry = store
        .exec_tx(move |conn| {
            Box::pin(async move {
                let entry = EntryRepository::create(
                    &mut *conn,
                    CreateEntryParams {
                        account_id,
                        amount: 30,
                    },
                )
                .await?;
                add_account_balance(&mut *conn, account_id, 30).await?;
                Ok(entry)
            })
        })
        .await
        .unwrap();

    let fetched = EntryRepository::get(store.pool(), entry.id).await.unwrap();
    assert_eq!(fetched, entry);
    let fetched = AccountRepository::get(store.pool(), account.id)
        .await
        .unwrap();
    assert_eq!(fetched.balance, account.balance + 30);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_dropped_session_rolls_back() {
    let store = create_test_store().await;
    let account = create_random_account(&store).await;

    {
        let mut tx = store.begin().await.unwrap();
        add_account_balance(&mut *tx, account.id, 99).await.unwrap();
        // Dropped without commit.
    }

    // A session still holding the row lock would block this update.
    let updated = tokio::time::timeout(
        Duration::from_secs(5),
        add_account_balance(store.pool(), account.id, 1),
    )
    .await
    .expect("row lock still held after the session was dropped")
    .unwrap();
    assert_eq!(updated.balance, account.balance + 1);
}
