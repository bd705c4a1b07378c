//! Simulation controller.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use simplebank_common::AccountId;
use simplebank_coordinator::{TransferCoordinator, TransferParams};
use simplebank_ledger::{AccountRepository, EntryRepository, LedgerError};

use crate::bank::{AccountFactory, SimulatedAccount};
use crate::metrics::SimulationMetrics;
use crate::scenario::Scenario;

/// Run parameters.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Accounts to create.
    pub accounts: usize,
    /// Transfers to issue.
    pub transfers: usize,
    /// Amount per transfer.
    pub amount: i64,
    /// Transfers in flight at once.
    pub concurrency: usize,
    /// Retries per transfer after a retryable failure.
    pub max_retries: u32,
    /// Base delay between retries, multiplied by the attempt number.
    pub retry_backoff: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            accounts: 2,
            transfers: 10,
            amount: 10,
            concurrency: 4,
            max_retries: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

/// What happened to one planned transfer.
#[derive(Debug)]
struct TransferOutcome {
    result: Result<(), LedgerError>,
    retries: u32,
    latency: Duration,
}

/// Issue one transfer, retrying retryable failures with linear backoff.
async fn transfer_with_retry(
    coordinator: TransferCoordinator,
    params: TransferParams,
    max_retries: u32,
    backoff: Duration,
) -> TransferOutcome {
    let start = Instant::now();
    let mut retries = 0;

    loop {
        match coordinator.transfer(params).await {
            Ok(result) => {
                debug!(transfer_id = %result.transfer.id, retries, "Transfer done");
                return TransferOutcome {
                    result: Ok(()),
                    retries,
                    latency: start.elapsed(),
                };
            }
            Err(err) if err.is_retryable() && retries < max_retries => {
                retries += 1;
                warn!(error = %err, attempt = retries, "Retrying transfer");
                tokio::time::sleep(backoff_delay(backoff, retries)).await;
            }
            Err(err) => {
                return TransferOutcome {
                    result: Err(err),
                    retries,
                    latency: start.elapsed(),
                };
            }
        }
    }
}

/// Post-run consistency check for one account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountCheck {
    pub account_id: AccountId,
    pub initial_balance: i64,
    pub final_balance: i64,
    pub entry_total: i64,
}

impl AccountCheck {
    /// The final balance is the initial balance plus every entry written.
    pub fn is_consistent(&self) -> bool {
        self.initial_balance.checked_add(self.entry_total) == Some(self.final_balance)
    }
}

/// Post-run consistency report.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub accounts: Vec<AccountCheck>,
    pub initial_total: i64,
    pub final_total: i64,
}

impl Verification {
    fn new(accounts: Vec<AccountCheck>) -> Self {
        let initial_total = accounts.iter().map(|a| a.initial_balance).sum();
        let final_total = accounts.iter().map(|a| a.final_balance).sum();
        Self {
            accounts,
            initial_total,
            final_total,
        }
    }

    /// Transfers move money, they never create or destroy it.
    pub fn is_conserved(&self) -> bool {
        self.initial_total == self.final_total
    }

    /// Every account is consistent and the total is conserved.
    pub fn passed(&self) -> bool {
        self.is_conserved() && self.accounts.iter().all(AccountCheck::is_consistent)
    }
}

/// Controls the simulation.
pub struct SimulationController {
    coordinator: TransferCoordinator,
    config: SimulationConfig,
    rng: StdRng,
    accounts: Vec<SimulatedAccount>,
    metrics: SimulationMetrics,
    elapsed: Duration,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(
        coordinator: TransferCoordinator,
        config: SimulationConfig,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            coordinator,
            config,
            rng,
            accounts: Vec::new(),
            metrics: SimulationMetrics::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Create the accounts for this run.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        let count = self.config.accounts;
        info!("Initializing simulation with {} accounts", count);

        let plans = AccountFactory::plan_accounts(&mut self.rng, count);
        let store = self.coordinator.store();
        self.accounts = AccountFactory::create_accounts(store, &plans).await?;

        for account in &self.accounts {
            info!(
                account_id = %account.id,
                owner = %account.owner,
                balance = account.initial_balance,
                "Account created"
            );
        }

        Ok(())
    }

    /// Run a scenario to completion.
    pub async fn run_scenario(&mut self, scenario: Scenario) -> anyhow::Result<()> {
        let ids: Vec<AccountId> = self.accounts.iter().map(|a| a.id).collect();
        let (transfers, amount) = (self.config.transfers, self.config.amount);
        let plan = scenario.plan(&mut self.rng, &ids, transfers, amount)?;

        info!(
            scenario = scenario.name(),
            transfers = plan.len(),
            concurrency = self.config.concurrency,
            "Running scenario"
        );

        let start = Instant::now();
        let coordinator = self.coordinator.clone();
        let max_retries = self.config.max_retries;
        let backoff = self.config.retry_backoff;

        let outcomes: Vec<TransferOutcome> = stream::iter(plan)
            .map(|params| transfer_with_retry(coordinator.clone(), params, max_retries, backoff))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        self.elapsed = start.elapsed();

        for outcome in outcomes {
            self.metrics.record_retries(outcome.retries);
            match outcome.result {
                Ok(()) => self
                    .metrics
                    .record_success(outcome.latency.as_millis() as u64),
                Err(err) => {
                    warn!(error = %err, code = err.error_code(), "Transfer failed");
                    self.metrics.record_failure();
                }
            }
        }

        Ok(())
    }

    /// Compare every account against its entry journal.
    pub async fn verify(&self) -> anyhow::Result<Verification> {
        let pool = self.coordinator.store().pool();
        let mut checks = Vec::with_capacity(self.accounts.len());

        for account in &self.accounts {
            let current = AccountRepository::get(pool, account.id).await?;
            let entry_total = EntryRepository::total_for_account(pool, account.id).await?;
            checks.push(AccountCheck {
                account_id: account.id,
                initial_balance: account.initial_balance,
                final_balance: current.balance,
                entry_total,
            });
        }

        let verification = Verification::new(checks);
        for check in verification.accounts.iter().filter(|c| !c.is_consistent()) {
            warn!(
                account_id = %check.account_id,
                initial = check.initial_balance,
                final_balance = check.final_balance,
                entry_total = check.entry_total,
                "Balance does not match entries"
            );
        }

        Ok(verification)
    }

    /// Get simulation metrics.
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Wall-clock time of the last scenario run.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Accounts taking part in the run.
    pub fn accounts(&self) -> &[SimulatedAccount] {
        &self.accounts
    }
}
