//! Simulation scenarios.

use rand::Rng;
use serde::Serialize;

use simplebank_common::random::random_int;
use simplebank_common::AccountId;
use simplebank_coordinator::TransferParams;

/// A transfer workload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Every transfer moves money from the first account to the second.
    SameDirection,
    /// Transfers alternate between the first two accounts in both directions.
    Deadlock,
    /// Transfers between random distinct pairs of all accounts.
    RandomMesh,
}

impl Scenario {
    /// Load a scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "same-direction" => Ok(Scenario::SameDirection),
            "deadlock" => Ok(Scenario::Deadlock),
            "random-mesh" => Ok(Scenario::RandomMesh),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// Scenario name as accepted by [`Scenario::load`].
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::SameDirection => "same-direction",
            Scenario::Deadlock => "deadlock",
            Scenario::RandomMesh => "random-mesh",
        }
    }

    /// Build the transfer requests for one run.
    ///
    /// Needs at least two accounts.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        accounts: &[AccountId],
        transfers: usize,
        amount: i64,
    ) -> anyhow::Result<Vec<TransferParams>> {
        if accounts.len() < 2 {
            return Err(anyhow::anyhow!(
                "Scenario {} needs at least 2 accounts, got {}",
                self.name(),
                accounts.len()
            ));
        }

        let (a, b) = (accounts[0], accounts[1]);
        let plan = match self {
            Scenario::SameDirection => (0..transfers)
                .map(|_| TransferParams::new(a, b, amount))
                .collect(),
            Scenario::Deadlock => (0..transfers)
                .map(|i| {
                    if i % 2 == 1 {
                        TransferParams::new(b, a, amount)
                    } else {
                        TransferParams::new(a, b, amount)
                    }
                })
                .collect(),
            Scenario::RandomMesh => {
                let last = accounts.len() as i64 - 1;
                (0..transfers)
                    .map(|_| {
                        let from = random_int(rng, 0, last) as usize;
                        // Skip over `from` so the pair is always distinct.
                        let mut to = random_int(rng, 0, last - 1) as usize;
                        if to >= from {
                            to += 1;
                        }
                        TransferParams::new(accounts[from], accounts[to], amount)
                    })
                    .collect()
            }
        };

        Ok(plan)
    }
}
