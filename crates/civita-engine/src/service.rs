//! Shared-state engine facade.
//!
//! Wraps the engine in an `Arc<RwLock>` so concurrent callers serialize every
//! state-mutating operation; each call is atomic with respect to the others.

use std::sync::Arc;

use civita_oracle::ReviewOutcome;
use civita_treasury::CreditLedger;
use civita_types::Address;
use parking_lot::RwLock;

use crate::engine::{VoteReceipt, VoterLedgerEntry, VotingEngine};
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::proposal::Proposal;
use crate::reputation::ReputationTier;

/// Cloneable handle serializing access to a [`VotingEngine`].
pub struct EngineService<L: CreditLedger> {
    inner: Arc<RwLock<VotingEngine<L>>>,
}

impl<L: CreditLedger> Clone for EngineService<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: CreditLedger> EngineService<L> {
    pub fn new(engine: VotingEngine<L>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn approve_beneficiary(
        &self,
        caller: Address,
        beneficiary: Address,
        detail_pointer: String,
        now: u64,
    ) -> Result<(), EngineError> {
        self.inner
            .write()
            .approve_beneficiary(caller, beneficiary, detail_pointer, now)
    }

    pub fn revoke_beneficiary(
        &self,
        caller: Address,
        beneficiary: Address,
    ) -> Result<(), EngineError> {
        self.inner.write().revoke_beneficiary(caller, beneficiary)
    }

    pub fn create_proposal(
        &self,
        caller: Address,
        descriptions: Vec<String>,
        amounts: Vec<u128>,
        now: u64,
    ) -> Result<u64, EngineError> {
        self.inner
            .write()
            .create_proposal(caller, descriptions, amounts, now)
    }

    pub fn kill_proposal(
        &self,
        caller: Address,
        proposal_id: u64,
        now: u64,
    ) -> Result<(), EngineError> {
        self.inner.write().kill_proposal(caller, proposal_id, now)
    }

    pub fn vote(
        &self,
        caller: Address,
        proposal_id: u64,
        additional_votes: u128,
        now: u64,
    ) -> Result<VoteReceipt, EngineError> {
        self.inner
            .write()
            .vote(caller, proposal_id, additional_votes, now)
    }

    pub fn reprocess_milestones(
        &self,
        caller: Address,
        proposal_id: u64,
        now: u64,
    ) -> Result<Vec<u32>, EngineError> {
        self.inner
            .write()
            .reprocess_milestones(caller, proposal_id, now)
    }

    pub fn submit_proof(
        &self,
        caller: Address,
        proposal_id: u64,
        milestone: u32,
        proof_pointer: String,
        now: u64,
    ) -> Result<u64, EngineError> {
        self.inner
            .write()
            .submit_proof(caller, proposal_id, milestone, proof_pointer, now)
    }

    pub fn review_proof(
        &self,
        caller: Address,
        submission_id: u64,
        approved: bool,
        reason: Option<String>,
        now: u64,
    ) -> Result<ReviewOutcome, EngineError> {
        self.inner
            .write()
            .review_proof(caller, submission_id, approved, reason, now)
    }

    pub fn deposit(&self, caller: Address, amount: u128, now: u64) -> Result<u128, EngineError> {
        self.inner.write().deposit(caller, amount, now)
    }

    pub fn execute_timelock(&self, id: u64, now: u64) -> Result<(), EngineError> {
        self.inner.write().execute_timelock(id, now)
    }

    pub fn set_mint_rate(&self, caller: Address, rate_bps: u64) -> Result<(), EngineError> {
        self.inner.write().set_mint_rate(caller, rate_bps)
    }

    // --- reads (snapshots; the engine stays locked only briefly) ---

    pub fn proposal(&self, id: u64) -> Option<Proposal> {
        self.inner.read().proposal(id).cloned()
    }

    pub fn milestone_flags(&self, id: u64, milestone: u32) -> Option<(bool, bool)> {
        self.inner.read().milestone_flags(id, milestone)
    }

    pub fn credit_balance(&self, holder: &Address) -> u128 {
        self.inner.read().credit_balance(holder)
    }

    pub fn reputation_tier(&self, voter: &Address) -> ReputationTier {
        self.inner.read().reputation_tier(voter)
    }

    pub fn voter_entry(&self, voter: &Address, proposal_id: u64) -> VoterLedgerEntry {
        self.inner.read().voter_entry(voter, proposal_id)
    }

    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.inner.write().drain_events()
    }

    /// Run a closure against the engine under the read lock.
    pub fn with_engine<R>(&self, f: impl FnOnce(&VotingEngine<L>) -> R) -> R {
        f(&self.inner.read())
    }
}
