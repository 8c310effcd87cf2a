//! Custodial treasury.
//!
//! Pools deposited base currency, mints voting credits at a configurable
//! rate, and releases funds only through the timelock queue or the admin
//! emergency paths. Queued transfers reserve their amount up front, so the
//! pool can never be promised twice.

use civita_types::{Address, AuthContext, Role};
use serde::{Deserialize, Serialize};

use crate::error::TreasuryError;
use crate::ledger::CreditLedger;
use crate::timelock::{TimelockEntry, TimelockQueue, TimelockStatus};

/// Basis-point denominator (10_000 = 1.0).
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Treasury configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryConfig {
    /// Credits minted per unit of base currency, in basis points
    pub mint_rate_bps: u64,
    /// Minimum delay between queuing and executing a transfer (seconds)
    pub min_delay_secs: u64,
    /// Grace window after eta during which execution stays possible;
    /// None disables lapsing
    pub grace_period_secs: Option<u64>,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            mint_rate_bps: 10_000,              // 1 credit per unit
            min_delay_secs: 172_800,            // 2 days
            grace_period_secs: Some(1_209_600), // 14 days
        }
    }
}

/// Type of treasury transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Base currency deposited, credits minted
    Deposit,
    /// Transfer queued behind the timelock
    Queue,
    /// Timelocked transfer executed
    Execute,
    /// Queued transfer lapsed past its grace window
    Lapse,
    /// Admin disbursement bypassing the timelock
    Disburse,
    /// Credits burned by an admin
    Burn,
}

/// Treasury transaction record.
#[derive(Debug, Clone)]
pub struct TreasuryTransaction {
    pub kind: TransactionKind,
    pub amount: u128,
    pub recipient: Option<Address>,
    pub source: Option<Address>,
    pub timestamp: u64,
}

/// Custodial pool of base currency plus the credit mint.
#[derive(Debug)]
pub struct Treasury<L: CreditLedger> {
    config: TreasuryConfig,
    ledger: L,
    /// Base currency held in custody
    pool: u128,
    /// Portion of the pool promised to queued transfers
    reserved: u128,
    total_deposited: u128,
    total_disbursed: u128,
    timelocks: TimelockQueue,
    transactions: Vec<TreasuryTransaction>,
}

impl<L: CreditLedger> Treasury<L> {
    pub fn new(config: TreasuryConfig, ledger: L) -> Self {
        Self {
            config,
            ledger,
            pool: 0,
            reserved: 0,
            total_deposited: 0,
            total_disbursed: 0,
            timelocks: TimelockQueue::new(),
            transactions: Vec::new(),
        }
    }

    /// Deposit base currency; mints credits to the depositor at the
    /// configured rate. The sole entry point for funding the pool.
    pub fn deposit(
        &mut self,
        depositor: Address,
        amount: u128,
        now: u64,
    ) -> Result<u128, TreasuryError> {
        if amount == 0 {
            return Err(TreasuryError::ZeroDeposit);
        }
        if self.config.mint_rate_bps == 0 {
            return Err(TreasuryError::ZeroMintRate);
        }
        let minted = amount
            .checked_mul(self.config.mint_rate_bps as u128)
            .ok_or(TreasuryError::Overflow)?
            / BPS_DENOMINATOR;
        self.pool = self.pool.checked_add(amount).ok_or(TreasuryError::Overflow)?;
        self.total_deposited = self.total_deposited.saturating_add(amount);
        self.ledger.mint(depositor, minted);
        self.transactions.push(TreasuryTransaction {
            kind: TransactionKind::Deposit,
            amount,
            recipient: None,
            source: Some(depositor),
            timestamp: now,
        });
        tracing::info!("deposit of {} from {} minted {} credits", amount, depositor, minted);
        Ok(minted)
    }

    /// Rejects base currency arriving outside `deposit`.
    pub fn direct_transfer(&mut self, _from: Address, _amount: u128) -> Result<(), TreasuryError> {
        Err(TreasuryError::DirectDepositNotAllowed)
    }

    /// Change the credit mint rate. Requires the admin role.
    /// A rate of 0 disables deposits.
    pub fn set_mint_rate(
        &mut self,
        auth: &AuthContext,
        caller: Address,
        rate_bps: u64,
    ) -> Result<(), TreasuryError> {
        auth.require(&caller, Role::Admin)?;
        tracing::info!(
            "mint rate changed from {} to {} bps",
            self.config.mint_rate_bps,
            rate_bps
        );
        self.config.mint_rate_bps = rate_bps;
        Ok(())
    }

    /// Queue a delayed transfer out of custody. Requires the engine role.
    ///
    /// The amount is reserved until the transfer executes or lapses.
    pub fn queue_transfer(
        &mut self,
        auth: &AuthContext,
        caller: Address,
        recipient: Address,
        amount: u128,
        eta: u64,
        now: u64,
    ) -> Result<u64, TreasuryError> {
        auth.require(&caller, Role::Engine)?;
        if amount == 0 {
            return Err(TreasuryError::ZeroAmount);
        }
        let available = self.available();
        if available < amount {
            return Err(TreasuryError::InsufficientFunds {
                available,
                requested: amount,
            });
        }

        let id = self
            .timelocks
            .schedule(recipient, amount, eta, now, self.config.min_delay_secs)?;
        self.reserved = self.reserved.saturating_add(amount);
        self.transactions.push(TreasuryTransaction {
            kind: TransactionKind::Queue,
            amount,
            recipient: Some(recipient),
            source: None,
            timestamp: now,
        });
        tracing::info!(
            "transfer {} of {} to {} queued, executable at {}",
            id,
            amount,
            recipient,
            eta
        );
        Ok(id)
    }

    /// Execute a due timelocked transfer. Permissionless.
    ///
    /// An entry executes exactly once and never before its eta. Past the
    /// grace window the entry lapses permanently and its reservation
    /// returns to the pool.
    pub fn execute_timelock(&mut self, id: u64, now: u64) -> Result<TimelockEntry, TreasuryError> {
        let (recipient, amount, eta, status) = {
            let entry = self.timelocks.get(id).ok_or(TreasuryError::NotFound(id))?;
            (entry.recipient, entry.amount, entry.eta, entry.status)
        };

        match status {
            TimelockStatus::Executed => return Err(TreasuryError::AlreadyExecuted(id)),
            TimelockStatus::Lapsed => return Err(TreasuryError::Expired(id)),
            TimelockStatus::Pending => {}
        }
        if now < eta {
            return Err(TreasuryError::NotYetDue { id, eta });
        }
        if let Some(grace) = self.config.grace_period_secs {
            if now > eta.saturating_add(grace) {
                if let Some(entry) = self.timelocks.get_mut(id) {
                    entry.status = TimelockStatus::Lapsed;
                }
                self.reserved = self.reserved.saturating_sub(amount);
                self.transactions.push(TreasuryTransaction {
                    kind: TransactionKind::Lapse,
                    amount,
                    recipient: Some(recipient),
                    source: None,
                    timestamp: now,
                });
                tracing::warn!("timelock {} lapsed unexecuted ({} to {})", id, amount, recipient);
                return Err(TreasuryError::Expired(id));
            }
        }

        self.reserved = self.reserved.saturating_sub(amount);
        self.pool = self.pool.saturating_sub(amount);
        self.total_disbursed = self.total_disbursed.saturating_add(amount);
        if let Some(entry) = self.timelocks.get_mut(id) {
            entry.status = TimelockStatus::Executed;
            entry.executed_at = Some(now);
        }
        self.transactions.push(TreasuryTransaction {
            kind: TransactionKind::Execute,
            amount,
            recipient: Some(recipient),
            source: None,
            timestamp: now,
        });
        tracing::info!("timelock {} executed: {} to {}", id, amount, recipient);
        self.timelocks
            .get(id)
            .cloned()
            .ok_or(TreasuryError::NotFound(id))
    }

    /// Burn vote payments from a voter's ledger balance. Engine role.
    pub fn spend_credits(
        &mut self,
        auth: &AuthContext,
        caller: Address,
        voter: &Address,
        amount: u128,
    ) -> Result<(), TreasuryError> {
        auth.require(&caller, Role::Engine)?;
        self.ledger.burn(voter, amount)
    }

    /// Emergency credit burn. Admin role, distinct from the engine path.
    pub fn burn(
        &mut self,
        auth: &AuthContext,
        caller: Address,
        voter: &Address,
        amount: u128,
        now: u64,
    ) -> Result<(), TreasuryError> {
        auth.require(&caller, Role::Admin)?;
        self.ledger.burn(voter, amount)?;
        self.transactions.push(TreasuryTransaction {
            kind: TransactionKind::Burn,
            amount,
            recipient: None,
            source: Some(*voter),
            timestamp: now,
        });
        tracing::warn!("admin burn of {} credits from {}", amount, voter);
        Ok(())
    }

    /// Emergency disbursement bypassing the timelock. Admin role.
    pub fn disburse(
        &mut self,
        auth: &AuthContext,
        caller: Address,
        recipient: Address,
        amount: u128,
        now: u64,
    ) -> Result<(), TreasuryError> {
        auth.require(&caller, Role::Admin)?;
        if amount == 0 {
            return Err(TreasuryError::ZeroAmount);
        }
        let available = self.available();
        if available < amount {
            return Err(TreasuryError::InsufficientFunds {
                available,
                requested: amount,
            });
        }
        self.pool -= amount;
        self.total_disbursed = self.total_disbursed.saturating_add(amount);
        self.transactions.push(TreasuryTransaction {
            kind: TransactionKind::Disburse,
            amount,
            recipient: Some(recipient),
            source: None,
            timestamp: now,
        });
        tracing::warn!("emergency disbursement of {} to {}", amount, recipient);
        Ok(())
    }

    /// Pool funds not promised to queued transfers.
    pub fn available(&self) -> u128 {
        self.pool.saturating_sub(self.reserved)
    }

    pub fn pool_balance(&self) -> u128 {
        self.pool
    }

    pub fn reserved(&self) -> u128 {
        self.reserved
    }

    pub fn total_deposited(&self) -> u128 {
        self.total_deposited
    }

    pub fn total_disbursed(&self) -> u128 {
        self.total_disbursed
    }

    pub fn credit_balance(&self, holder: &Address) -> u128 {
        self.ledger.balance_of(holder)
    }

    pub fn mint_rate_bps(&self) -> u64 {
        self.config.mint_rate_bps
    }

    pub fn min_delay_secs(&self) -> u64 {
        self.config.min_delay_secs
    }

    pub fn timelock(&self, id: u64) -> Option<&TimelockEntry> {
        self.timelocks.get(id)
    }

    /// Pending timelocked transfers, soonest first.
    pub fn pending_timelocks(&self) -> Vec<&TimelockEntry> {
        self.timelocks.pending()
    }

    pub fn transactions(&self) -> &[TreasuryTransaction] {
        &self.transactions
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}
