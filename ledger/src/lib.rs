//! SimpleBank Ledger Store
//!
//! Accounts, append-only entries and transfer records in PostgreSQL, plus the
//! single-statement balance adjustment used on the transfer path.

pub mod account;
pub mod balance;
pub mod error;
pub mod journal;
pub mod store;
pub mod transfer;

#[cfg(test)]
mod integration_tests;

pub use account::{
    Account, AccountRepository, CreateAccountParams, ListAccountsParams, UpdateAccountParams,
};
pub use balance::{add_account_balance, BalanceAdjustment};
pub use error::{LedgerError, Result};
pub use journal::{CreateEntryParams, Entry, EntryRepository, EntryType, ListEntriesParams};
pub use store::{Store, StoreConfig, SCHEMA};
pub use transfer::{CreateTransferParams, ListTransfersParams, Transfer, TransferRepository};
