//! Credit ledger interface.
//!
//! The fungible credit store is an external collaborator; the treasury mints
//! into it on deposit and burns from it when votes are paid for. Only the
//! balance/mint/burn surface is assumed here.

use std::collections::HashMap;

use civita_types::Address;

use crate::error::TreasuryError;

/// Balance store for voting credits.
pub trait CreditLedger {
    /// Current credit balance of a holder.
    fn balance_of(&self, holder: &Address) -> u128;

    /// Create credits for a holder.
    fn mint(&mut self, holder: Address, amount: u128);

    /// Destroy credits held by `holder`. Fails when the balance is short.
    fn burn(&mut self, holder: &Address, amount: u128) -> Result<(), TreasuryError>;

    /// Total credits in circulation.
    fn total_supply(&self) -> u128;
}

/// HashMap-backed ledger for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<Address, u128>,
    total_supply: u128,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CreditLedger for InMemoryLedger {
    fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn mint(&mut self, holder: Address, amount: u128) {
        let balance = self.balance_of(&holder);
        self.balances.insert(holder, balance.saturating_add(amount));
        self.total_supply = self.total_supply.saturating_add(amount);
    }

    fn burn(&mut self, holder: &Address, amount: u128) -> Result<(), TreasuryError> {
        let balance = self.balance_of(holder);
        if balance < amount {
            return Err(TreasuryError::InsufficientCredits {
                have: balance,
                need: amount,
            });
        }
        self.balances.insert(*holder, balance - amount);
        self.total_supply -= amount;
        Ok(())
    }

    fn total_supply(&self) -> u128 {
        self.total_supply
    }
}
