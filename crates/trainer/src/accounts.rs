//! Account ledger interface for trainer payouts
//!
//! Refunds, report rewards and overpaid change are credited through this
//! trait; the host environment decides where the funds actually live.

use decai_types::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{Result, TrainerError};

/// Interface for crediting and debiting balances.
pub trait AccountLedger {
    /// Credit an address.
    fn credit(&mut self, address: &Address, amount: Amount) -> Result<()>;

    /// Debit an address; fails if its balance is short.
    fn debit(&mut self, address: &Address, amount: Amount) -> Result<()>;

    /// Current balance of an address.
    fn balance(&self, address: &Address) -> Amount;
}

// -----------------------------------------------------------------------------
// In-memory implementation (tests, CLI replay)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryAccountLedger {
    balances: BTreeMap<Address, Amount>,
    total_supply: Amount,
}

impl InMemoryAccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a set of funded accounts.
    pub fn with_balances(balances: impl IntoIterator<Item = (Address, Amount)>) -> Result<Self> {
        let mut ledger = Self::new();
        for (address, amount) in balances {
            ledger.credit(&address, amount)?;
        }
        Ok(ledger)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balances(&self) -> &BTreeMap<Address, Amount> {
        &self.balances
    }
}

impl AccountLedger for InMemoryAccountLedger {
    fn credit(&mut self, address: &Address, amount: Amount) -> Result<()> {
        let current = self.balances.get(address).copied().unwrap_or(0);
        let overflow = || TrainerError::Account {
            address: *address,
            reason: format!("credit of {amount} overflows"),
        };
        let balance = current.checked_add(amount).ok_or_else(overflow)?;
        let supply = self.total_supply.checked_add(amount).ok_or_else(overflow)?;
        self.balances.insert(*address, balance);
        self.total_supply = supply;
        Ok(())
    }

    fn debit(&mut self, address: &Address, amount: Amount) -> Result<()> {
        let current = self.balances.get(address).copied().unwrap_or(0);
        if current < amount {
            return Err(TrainerError::Account {
                address: *address,
                reason: format!("insufficient balance: {current} < {amount}"),
            });
        }
        self.balances.insert(*address, current - amount);
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }

    fn balance(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }
}

/// Credit `amount` to `to`, run `commit`, and take the credit back if the
/// commit fails. A debit of funds just credited cannot fail.
pub(crate) fn credit_then_commit<A, T, F>(
    accounts: &mut A,
    to: &Address,
    amount: Amount,
    commit: F,
) -> Result<T>
where
    A: AccountLedger + ?Sized,
    F: FnOnce() -> Result<T>,
{
    if amount == 0 {
        return commit();
    }
    accounts.credit(to, amount)?;
    match commit() {
        Ok(value) => Ok(value),
        Err(err) => {
            accounts.debit(to, amount)?;
            Err(err)
        }
    }
}
