//! Simulated bank accounts.

use rand::Rng;
use serde::Serialize;

use simplebank_common::random::{random_currency, random_money, random_owner};
use simplebank_common::AccountId;
use simplebank_ledger::{Account, AccountRepository, CreateAccountParams, Store};

/// An account taking part in a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulatedAccount {
    /// Account identifier.
    pub id: AccountId,
    /// Owner name.
    pub owner: String,
    /// Balance when the run started.
    pub initial_balance: i64,
}

impl From<Account> for SimulatedAccount {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            owner: account.owner,
            initial_balance: account.balance,
        }
    }
}

/// Account factory for creating test accounts.
pub struct AccountFactory;

impl AccountFactory {
    /// Generate parameters for `count` random accounts.
    pub fn plan_accounts<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<CreateAccountParams> {
        (0..count)
            .map(|_| CreateAccountParams {
                owner: random_owner(rng),
                balance: random_money(rng),
                currency: random_currency(rng),
            })
            .collect()
    }

    /// Insert the planned accounts.
    pub async fn create_accounts(
        store: &Store,
        plans: &[CreateAccountParams],
    ) -> simplebank_ledger::Result<Vec<SimulatedAccount>> {
        let mut accounts = Vec::with_capacity(plans.len());
        for params in plans {
            let account = AccountRepository::create(store.pool(), params).await?;
            accounts.push(SimulatedAccount::from(account));
        }
        Ok(accounts)
    }
}
