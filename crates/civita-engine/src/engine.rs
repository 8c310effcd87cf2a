//! The voting engine.
//!
//! Orchestrates quadratic voting over milestone-gated proposals: prices each
//! vote, burns the payment, advances milestone state, and queues timelocked
//! disbursements with the treasury. Internal state is always mutated before
//! the treasury is invoked; a failed queue attempt is retried through
//! `reprocess_milestones` rather than rolled back.

use std::collections::HashMap;

use civita_oracle::{BeneficiaryRegistry, ProofRegistry, ReviewOutcome};
use civita_treasury::{CreditLedger, Treasury};
use civita_types::{Address, AuthContext, Role};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{EngineEvent, EventLog};
use crate::proposal::{Proposal, ProposalRegistry};
use crate::reputation::{ReputationBook, ReputationRecord, ReputationTier};
use crate::voting;

/// Cumulative per-(voter, proposal) voting position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoterLedgerEntry {
    /// Votes held on the proposal
    pub votes: u128,
    /// Credits spent acquiring them
    pub credits_spent: u128,
}

/// Outcome of a successful vote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    pub proposal: u64,
    pub votes_cast: u128,
    pub cost: u128,
    /// Voter's cumulative votes on this proposal afterwards
    pub voter_total: u128,
    /// Proposal's cumulative tally afterwards
    pub proposal_total: u128,
    /// Milestones released by this call
    pub released: Vec<u32>,
}

/// The funding engine: proposals, voting, custody, and the oracle wiring.
pub struct VotingEngine<L: CreditLedger> {
    config: EngineConfig,
    auth: AuthContext,
    /// Identity the engine uses for role-gated treasury calls
    identity: Address,
    proposals: ProposalRegistry,
    beneficiaries: BeneficiaryRegistry,
    proofs: ProofRegistry,
    treasury: Treasury<L>,
    voter_ledger: HashMap<(Address, u64), VoterLedgerEntry>,
    reputation: ReputationBook,
    events: EventLog,
}

impl<L: CreditLedger> VotingEngine<L> {
    /// Wire up an engine. `identity` is granted the engine role in `auth`.
    pub fn new(
        config: EngineConfig,
        identity: Address,
        mut auth: AuthContext,
        treasury: Treasury<L>,
    ) -> Self {
        auth.grant(identity, Role::Engine);
        let proposals = ProposalRegistry::new(config.proposal_window_secs, config.vote_scale);
        Self {
            config,
            auth,
            identity,
            proposals,
            beneficiaries: BeneficiaryRegistry::new(),
            proofs: ProofRegistry::new(),
            treasury,
            voter_ledger: HashMap::new(),
            reputation: ReputationBook::new(),
            events: EventLog::new(),
        }
    }

    // --- beneficiary oracle ---

    /// Allowlist a beneficiary. Oracle-admin role.
    pub fn approve_beneficiary(
        &mut self,
        caller: Address,
        beneficiary: Address,
        detail_pointer: String,
        now: u64,
    ) -> Result<(), EngineError> {
        self.beneficiaries
            .approve(&self.auth, caller, beneficiary, detail_pointer, now)?;
        self.events
            .publish(EngineEvent::BeneficiaryApproved { beneficiary });
        Ok(())
    }

    /// Remove a beneficiary from the allowlist. Oracle-admin role.
    pub fn revoke_beneficiary(
        &mut self,
        caller: Address,
        beneficiary: Address,
    ) -> Result<(), EngineError> {
        self.beneficiaries.revoke(&self.auth, caller, beneficiary)?;
        self.events
            .publish(EngineEvent::BeneficiaryRevoked { beneficiary });
        Ok(())
    }

    // --- proposals ---

    /// Open a proposal. The caller must be an allowlisted beneficiary.
    pub fn create_proposal(
        &mut self,
        caller: Address,
        descriptions: Vec<String>,
        amounts: Vec<u128>,
        now: u64,
    ) -> Result<u64, EngineError> {
        if !self.beneficiaries.is_approved(&caller) {
            return Err(EngineError::UnauthorizedBeneficiary(caller));
        }
        let id = self.proposals.create(caller, descriptions, amounts, now)?;
        if let Some(proposal) = self.proposals.get(id) {
            self.events.publish(EngineEvent::ProposalCreated {
                proposal: id,
                beneficiary: caller,
                milestones: proposal.milestones.len(),
                expires_at: proposal.expires_at,
            });
        }
        tracing::info!("proposal {} created by {}", id, caller);
        Ok(id)
    }

    /// Kill an expired proposal. Admin role.
    pub fn kill_proposal(
        &mut self,
        caller: Address,
        proposal_id: u64,
        now: u64,
    ) -> Result<(), EngineError> {
        self.auth.require(&caller, Role::Admin)?;
        self.proposals.kill(proposal_id, now)?;
        self.events
            .publish(EngineEvent::ProposalKilled { proposal: proposal_id });
        tracing::info!("proposal {} killed", proposal_id);
        Ok(())
    }

    // --- voting ---

    /// Cast `additional_votes` on a proposal, paying the quadratic marginal
    /// cost (less any reputation discount) in burned credits.
    pub fn vote(
        &mut self,
        caller: Address,
        proposal_id: u64,
        additional_votes: u128,
        now: u64,
    ) -> Result<VoteReceipt, EngineError> {
        if additional_votes == 0 {
            return Err(EngineError::InvalidVotes);
        }
        let proposal = self
            .proposals
            .get(proposal_id)
            .ok_or(EngineError::ProposalNotValid(proposal_id))?;
        proposal.check_votable(now)?;

        let key = (caller, proposal_id);
        let entry = self.voter_ledger.get(&key).copied().unwrap_or_default();
        // Tier is derived from the record as it stood before this call
        let tier = self.reputation.tier_of(&caller);
        let cost = voting::charge(entry.votes, additional_votes, tier)?;

        let balance = self.treasury.credit_balance(&caller);
        if balance < cost {
            return Err(EngineError::InsufficientCredits {
                have: balance,
                need: cost,
            });
        }

        // All checks passed; commit
        self.treasury
            .spend_credits(&self.auth, self.identity, &caller, cost)?;
        let updated = VoterLedgerEntry {
            votes: entry.votes + additional_votes,
            credits_spent: entry.credits_spent.saturating_add(cost),
        };
        self.voter_ledger.insert(key, updated);

        let proposal_total = {
            let proposal = self
                .proposals
                .get_mut(proposal_id)
                .ok_or(EngineError::ProposalNotValid(proposal_id))?;
            proposal.total_votes = proposal.total_votes.saturating_add(additional_votes);
            proposal.total_credits_burned =
                proposal.total_credits_burned.saturating_add(cost);
            proposal.total_votes
        };
        self.reputation
            .record_vote(caller, proposal_id, additional_votes, now);
        self.events.publish(EngineEvent::VoteCast {
            proposal: proposal_id,
            voter: caller,
            votes: additional_votes,
            cost,
            total_votes: proposal_total,
        });
        tracing::debug!(
            "{} cast {} votes on proposal {} for {} credits",
            caller,
            additional_votes,
            proposal_id,
            cost
        );

        let released = self.release_due_milestones(proposal_id, now);

        Ok(VoteReceipt {
            proposal: proposal_id,
            votes_cast: additional_votes,
            cost,
            voter_total: updated.votes,
            proposal_total,
            released,
        })
    }

    /// Re-run milestone release without a new vote. Admin role.
    ///
    /// Recovers from a queue failure (e.g. an underfunded pool at release
    /// time) and releases a milestone whose threshold the cumulative tally
    /// already meets once verification lands.
    pub fn reprocess_milestones(
        &mut self,
        caller: Address,
        proposal_id: u64,
        now: u64,
    ) -> Result<Vec<u32>, EngineError> {
        self.auth.require(&caller, Role::Admin)?;
        let proposal = self
            .proposals
            .get(proposal_id)
            .ok_or(EngineError::ProposalNotFound(proposal_id))?;
        if !proposal.valid {
            return Err(EngineError::ProposalNotValid(proposal_id));
        }
        Ok(self.release_due_milestones(proposal_id, now))
    }

    /// Advance milestone state: queue transfers for released milestones that
    /// missed theirs, then release every further milestone whose gate is
    /// open and threshold met. Returns the newly released indexes.
    fn release_due_milestones(&mut self, proposal_id: u64, now: u64) -> Vec<u32> {
        let mut released = Vec::new();

        // Re-queue released milestones whose transfer never got queued
        let requeue: Vec<(usize, u128)> = match self.proposals.get(proposal_id) {
            Some(proposal) => proposal
                .milestones
                .iter()
                .enumerate()
                .filter(|(_, m)| m.released && m.timelock_id.is_none())
                .map(|(index, m)| (index, m.amount))
                .collect(),
            None => return released,
        };
        for (index, amount) in requeue {
            if let Some(timelock_id) = self.queue_milestone_transfer(proposal_id, amount, now) {
                if let Some(proposal) = self.proposals.get_mut(proposal_id) {
                    proposal.milestones[index].timelock_id = Some(timelock_id);
                }
            }
        }

        // Release as far as gates and thresholds allow
        loop {
            let (index, amount) = match self.proposals.get(proposal_id) {
                Some(proposal) => {
                    if proposal.is_fully_funded() {
                        break;
                    }
                    let index = proposal.next_milestone;
                    if index > 0 && !proposal.milestones[index - 1].verified {
                        break;
                    }
                    if proposal.total_votes < proposal.milestones[index].vote_threshold {
                        break;
                    }
                    (index, proposal.milestones[index].amount)
                }
                None => break,
            };

            // Mark released before touching the treasury
            if let Some(proposal) = self.proposals.get_mut(proposal_id) {
                let milestone = &mut proposal.milestones[index];
                milestone.released = true;
                milestone.released_at = Some(now);
                proposal.next_milestone += 1;
            }
            let timelock_id = self.queue_milestone_transfer(proposal_id, amount, now);
            if let Some(proposal) = self.proposals.get_mut(proposal_id) {
                proposal.milestones[index].timelock_id = timelock_id;
            }
            self.events.publish(EngineEvent::MilestoneReleased {
                proposal: proposal_id,
                milestone: index as u32,
                amount,
                timelock_id,
            });
            tracing::info!(
                "milestone {} of proposal {} released ({} queued as {:?})",
                index,
                proposal_id,
                amount,
                timelock_id
            );
            released.push(index as u32);
        }

        // Fully funded proposals leave the active index
        let newly_funded = match self.proposals.get_mut(proposal_id) {
            Some(proposal) if proposal.is_fully_funded() && proposal.funded_at.is_none() => {
                proposal.funded_at = Some(now);
                true
            }
            _ => false,
        };
        if newly_funded {
            self.proposals.deactivate(proposal_id);
            self.events
                .publish(EngineEvent::ProposalFullyFunded { proposal: proposal_id });
            tracing::info!("proposal {} fully funded", proposal_id);
        }

        released
    }

    fn queue_milestone_transfer(
        &mut self,
        proposal_id: u64,
        amount: u128,
        now: u64,
    ) -> Option<u64> {
        let beneficiary = self.proposals.get(proposal_id)?.beneficiary;
        let eta = now.saturating_add(self.treasury.min_delay_secs());
        match self
            .treasury
            .queue_transfer(&self.auth, self.identity, beneficiary, amount, eta, now)
        {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(
                    "queuing {} for proposal {} failed: {}",
                    amount,
                    proposal_id,
                    err
                );
                None
            }
        }
    }

    // --- proofs ---

    /// Submit an attestation for a released milestone. Beneficiary only.
    pub fn submit_proof(
        &mut self,
        caller: Address,
        proposal_id: u64,
        milestone: u32,
        proof_pointer: String,
        now: u64,
    ) -> Result<u64, EngineError> {
        let proposal = self
            .proposals
            .get(proposal_id)
            .ok_or(EngineError::ProposalNotFound(proposal_id))?;
        let stage = proposal
            .milestones
            .get(milestone as usize)
            .ok_or(EngineError::MilestoneOutOfRange {
                proposal: proposal_id,
                milestone,
            })?;
        if !stage.released {
            return Err(EngineError::MilestoneNotReleased {
                proposal: proposal_id,
                milestone,
            });
        }
        let owner = proposal.beneficiary;

        let submission =
            self.proofs
                .submit(caller, owner, proposal_id, milestone, proof_pointer, now)?;
        self.events.publish(EngineEvent::ProofSubmitted {
            proposal: proposal_id,
            milestone,
            submission,
        });
        Ok(submission)
    }

    /// Review a proof submission. Oracle-admin role. Approval flips the
    /// milestone to verified.
    pub fn review_proof(
        &mut self,
        caller: Address,
        submission_id: u64,
        approved: bool,
        reason: Option<String>,
        now: u64,
    ) -> Result<ReviewOutcome, EngineError> {
        let outcome = self
            .proofs
            .review(&self.auth, caller, submission_id, approved, reason, now)?;
        if outcome.approved {
            if let Some(proposal) = self.proposals.get_mut(outcome.proposal_id) {
                if let Some(milestone) = proposal.milestones.get_mut(outcome.milestone as usize) {
                    milestone.verified = true;
                }
            }
        }
        self.events.publish(EngineEvent::ProofReviewed {
            proposal: outcome.proposal_id,
            milestone: outcome.milestone,
            submission: submission_id,
            approved,
        });
        Ok(outcome)
    }

    // --- treasury ---

    /// Fund the pool; mints credits to the depositor.
    pub fn deposit(
        &mut self,
        caller: Address,
        amount: u128,
        now: u64,
    ) -> Result<u128, EngineError> {
        let credits = self.treasury.deposit(caller, amount, now)?;
        self.events.publish(EngineEvent::Deposited {
            depositor: caller,
            amount,
            credits,
        });
        Ok(credits)
    }

    /// Execute a due timelocked transfer. Permissionless.
    pub fn execute_timelock(&mut self, id: u64, now: u64) -> Result<(), EngineError> {
        let entry = self.treasury.execute_timelock(id, now)?;
        self.events.publish(EngineEvent::TransferExecuted {
            timelock: id,
            recipient: entry.recipient,
            amount: entry.amount,
        });
        Ok(())
    }

    /// Change the credit mint rate. Admin role.
    pub fn set_mint_rate(&mut self, caller: Address, rate_bps: u64) -> Result<(), EngineError> {
        self.treasury
            .set_mint_rate(&self.auth, caller, rate_bps)
            .map_err(Into::into)
    }

    /// Emergency credit burn. Admin role.
    pub fn admin_burn(
        &mut self,
        caller: Address,
        voter: Address,
        amount: u128,
        now: u64,
    ) -> Result<(), EngineError> {
        self.treasury
            .burn(&self.auth, caller, &voter, amount, now)
            .map_err(Into::into)
    }

    /// Emergency disbursement bypassing the timelock. Admin role.
    pub fn admin_disburse(
        &mut self,
        caller: Address,
        recipient: Address,
        amount: u128,
        now: u64,
    ) -> Result<(), EngineError> {
        self.treasury
            .disburse(&self.auth, caller, recipient, amount, now)
            .map_err(Into::into)
    }

    // --- reads ---

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    pub fn active_proposals(&self) -> Vec<u64> {
        self.proposals.active_ids()
    }

    /// (released, verified) flags for one milestone.
    pub fn milestone_flags(&self, id: u64, milestone: u32) -> Option<(bool, bool)> {
        self.proposals.milestone_flags(id, milestone)
    }

    pub fn credit_balance(&self, holder: &Address) -> u128 {
        self.treasury.credit_balance(holder)
    }

    pub fn reputation_tier(&self, voter: &Address) -> ReputationTier {
        self.reputation.tier_of(voter)
    }

    pub fn reputation(&self, voter: &Address) -> Option<&ReputationRecord> {
        self.reputation.get(voter)
    }

    /// Cumulative votes and spend for one (voter, proposal) pair.
    pub fn voter_entry(&self, voter: &Address, proposal_id: u64) -> VoterLedgerEntry {
        self.voter_ledger
            .get(&(*voter, proposal_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn treasury(&self) -> &Treasury<L> {
        &self.treasury
    }

    pub fn beneficiaries(&self) -> &BeneficiaryRegistry {
        &self.beneficiaries
    }

    pub fn proofs(&self) -> &ProofRegistry {
        &self.proofs
    }

    pub fn events(&self) -> &[EngineEvent] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn identity(&self) -> Address {
        self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civita_treasury::{InMemoryLedger, TimelockStatus, TreasuryConfig, TreasuryError};

    const DAY: u64 = 86_400;
    const WINDOW: u64 = 7 * DAY;
    const MIN_DELAY: u64 = 2 * DAY;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn admin() -> Address {
        addr(100)
    }

    fn oracle_admin() -> Address {
        addr(101)
    }

    fn ngo() -> Address {
        addr(1)
    }

    fn setup() -> VotingEngine<InMemoryLedger> {
        let mut auth = AuthContext::new();
        auth.grant(admin(), Role::Admin);
        auth.grant(oracle_admin(), Role::OracleAdmin);

        let treasury = Treasury::new(
            TreasuryConfig {
                mint_rate_bps: 10_000,
                min_delay_secs: MIN_DELAY,
                grace_period_secs: Some(14 * DAY),
            },
            InMemoryLedger::new(),
        );
        let config = EngineConfig {
            vote_scale: 100,
            proposal_window_secs: WINDOW,
        };
        let mut engine = VotingEngine::new(config, addr(200), auth, treasury);
        engine
            .approve_beneficiary(oracle_admin(), ngo(), "ipfs://ngo".to_string(), 0)
            .unwrap();
        engine
    }

    /// Engine with one proposal: milestones of 500 and 1_000 at scale 100
    /// (thresholds 5 and 10), plus a funded voter.
    fn setup_with_proposal(voter: Address, balance: u128) -> (VotingEngine<InMemoryLedger>, u64) {
        let mut engine = setup();
        engine.deposit(voter, balance, 0).unwrap();
        let id = engine
            .create_proposal(
                ngo(),
                vec!["drill wells".to_string(), "install pumps".to_string()],
                vec![500, 1_000],
                0,
            )
            .unwrap();
        (engine, id)
    }

    #[test]
    fn test_create_requires_allowlisted_beneficiary() {
        let mut engine = setup();
        let err = engine
            .create_proposal(addr(9), vec!["m".to_string()], vec![100], 0)
            .unwrap_err();
        assert_eq!(err, EngineError::UnauthorizedBeneficiary(addr(9)));
    }

    #[test]
    fn test_revoked_beneficiary_cannot_create() {
        let mut engine = setup();
        engine.revoke_beneficiary(oracle_admin(), ngo()).unwrap();
        let err = engine
            .create_proposal(ngo(), vec!["m".to_string()], vec![100], 0)
            .unwrap_err();
        assert_eq!(err, EngineError::UnauthorizedBeneficiary(ngo()));
    }

    #[test]
    fn test_fresh_voter_pays_quadratic_cost() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);

        let receipt = engine.vote(voter, id, 5, 10).unwrap();
        assert_eq!(receipt.cost, 25);
        assert_eq!(receipt.voter_total, 5);
        assert_eq!(receipt.proposal_total, 5);
        assert_eq!(engine.credit_balance(&voter), 75);

        let entry = engine.voter_entry(&voter, id);
        assert_eq!(entry.votes, 5);
        assert_eq!(entry.credits_spent, 25);
    }

    #[test]
    fn test_zero_votes_rejected() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);
        assert_eq!(engine.vote(voter, id, 0, 10).unwrap_err(), EngineError::InvalidVotes);
    }

    #[test]
    fn test_vote_on_missing_or_expired_proposal() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);

        assert_eq!(
            engine.vote(voter, 99, 1, 10).unwrap_err(),
            EngineError::ProposalNotValid(99)
        );
        assert_eq!(
            engine.vote(voter, id, 1, WINDOW).unwrap_err(),
            EngineError::ProposalNotValid(id)
        );
    }

    #[test]
    fn test_insufficient_credits() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 10);

        let err = engine.vote(voter, id, 4, 10).unwrap_err();
        assert_eq!(err, EngineError::InsufficientCredits { have: 10, need: 16 });
        // Nothing changed
        assert_eq!(engine.credit_balance(&voter), 10);
        assert_eq!(engine.voter_entry(&voter, id), VoterLedgerEntry::default());
        assert_eq!(engine.proposal(id).unwrap().total_votes, 0);
    }

    #[test]
    fn test_repeat_votes_pay_marginal_cost() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);

        // 3 votes then 1 more: 9, then 16 - 9 = 7
        assert_eq!(engine.vote(voter, id, 3, 10).unwrap().cost, 9);
        assert_eq!(engine.vote(voter, id, 1, 20).unwrap().cost, 7);

        let entry = engine.voter_entry(&voter, id);
        assert_eq!(entry.votes, 4);
        assert_eq!(entry.credits_spent, 16);
        // Spend equals the square of held votes
        assert_eq!(entry.credits_spent, entry.votes * entry.votes);
    }

    #[test]
    fn test_milestone_release_queues_timelocked_transfer() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);
        // Pool needs funds beyond the voter's own deposit
        engine.deposit(addr(3), 2_000, 0).unwrap();

        let receipt = engine.vote(voter, id, 5, 10).unwrap();
        assert_eq!(receipt.released, vec![0]);

        let proposal = engine.proposal(id).unwrap();
        assert!(proposal.milestones[0].released);
        assert!(!proposal.milestones[0].verified);
        assert_eq!(proposal.next_milestone, 1);

        let timelock_id = proposal.milestones[0].timelock_id.unwrap();
        let entry = engine.treasury().timelock(timelock_id).unwrap();
        assert_eq!(entry.recipient, ngo());
        assert_eq!(entry.amount, 500);
        assert_eq!(entry.eta, 10 + MIN_DELAY);
        assert_eq!(engine.treasury().reserved(), 500);

        // Not due yet
        let err = engine.execute_timelock(timelock_id, 10 + MIN_DELAY - 1).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Treasury(TreasuryError::NotYetDue { .. })
        ));

        // Due: executes exactly once
        engine.execute_timelock(timelock_id, 10 + MIN_DELAY).unwrap();
        assert_eq!(
            engine.treasury().timelock(timelock_id).unwrap().status,
            TimelockStatus::Executed
        );
        let err = engine.execute_timelock(timelock_id, 10 + MIN_DELAY + 1).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Treasury(TreasuryError::AlreadyExecuted(_))
        ));
    }

    #[test]
    fn test_next_milestone_gated_on_verification() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 1_000);
        engine.deposit(addr(3), 5_000, 0).unwrap();

        engine.vote(voter, id, 5, 10).unwrap();
        assert_eq!(engine.milestone_flags(id, 0), Some((true, false)));

        // Further voting is blocked until the released stage verifies
        let err = engine.vote(voter, id, 1, 20).unwrap_err();
        assert_eq!(
            err,
            EngineError::PriorMilestoneUnverified {
                proposal: id,
                milestone: 0
            }
        );

        // Beneficiary attests, oracle admin approves
        let submission = engine
            .submit_proof(ngo(), id, 0, "ipfs://wells-report".to_string(), 30)
            .unwrap();
        engine
            .review_proof(oracle_admin(), submission, true, None, 40)
            .unwrap();
        assert_eq!(engine.milestone_flags(id, 0), Some((true, true)));

        // Voting reopens; threshold for stage 1 is 10 cumulative votes
        let receipt = engine.vote(voter, id, 4, 50).unwrap();
        assert!(receipt.released.is_empty());
        let receipt = engine.vote(voter, id, 1, 60).unwrap();
        assert_eq!(receipt.released, vec![1]);
        assert_eq!(receipt.proposal_total, 10);

        // All milestones released: terminal
        let proposal = engine.proposal(id).unwrap();
        assert!(proposal.is_fully_funded());
        assert_eq!(proposal.funded_at, Some(60));
        assert!(engine.active_proposals().is_empty());
        let err = engine.vote(voter, id, 1, 70).unwrap_err();
        assert_eq!(err, EngineError::ProposalFullyFunded(id));
    }

    #[test]
    fn test_proof_requires_release_and_owner() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);

        // Nothing released yet
        let err = engine
            .submit_proof(ngo(), id, 0, "ipfs://early".to_string(), 10)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::MilestoneNotReleased {
                proposal: id,
                milestone: 0
            }
        );

        let err = engine
            .submit_proof(ngo(), id, 7, "ipfs://oob".to_string(), 10)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::MilestoneOutOfRange {
                proposal: id,
                milestone: 7
            }
        );

        engine.deposit(addr(3), 1_000, 0).unwrap();
        engine.vote(voter, id, 5, 10).unwrap();

        // Only the registered beneficiary may submit
        let err = engine
            .submit_proof(addr(9), id, 0, "ipfs://fake".to_string(), 20)
            .unwrap_err();
        assert!(matches!(err, EngineError::Oracle(_)));

        assert!(engine
            .submit_proof(ngo(), id, 0, "ipfs://real".to_string(), 20)
            .is_ok());
    }

    #[test]
    fn test_review_is_processed_once() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);
        engine.deposit(addr(3), 1_000, 0).unwrap();
        engine.vote(voter, id, 5, 10).unwrap();

        let submission = engine
            .submit_proof(ngo(), id, 0, "ipfs://proof".to_string(), 20)
            .unwrap();
        engine
            .review_proof(oracle_admin(), submission, true, None, 30)
            .unwrap();

        let err = engine
            .review_proof(oracle_admin(), submission, false, None, 40)
            .unwrap_err();
        assert!(matches!(err, EngineError::Oracle(_)));
        // Verified flag survives the failed repeat
        assert_eq!(engine.milestone_flags(id, 0), Some((true, true)));
    }

    #[test]
    fn test_trusted_voter_discount() {
        let voter = addr(2);
        let mut engine = setup();
        engine.deposit(voter, 10_000, 0).unwrap();

        // Build history: 5 sessions of 4 votes across 5 proposals over 8 days
        let mut history = Vec::new();
        for n in 0..4 {
            let id = engine
                .create_proposal(
                    ngo(),
                    vec![format!("stage {}", n)],
                    vec![100_000], // high threshold; nothing releases
                    0,
                )
                .unwrap();
            history.push(id);
        }
        engine.vote(voter, history[0], 4, 0).unwrap();
        engine.vote(voter, history[1], 4, 2 * DAY).unwrap();
        engine.vote(voter, history[2], 4, 4 * DAY).unwrap();
        engine.vote(voter, history[3], 4, 6 * DAY).unwrap();

        // Not yet: 4 sessions over 6 days
        assert_eq!(engine.reputation_tier(&voter), ReputationTier::Regular);

        // Fifth session on a later proposal stretches the span to 8 days
        let late = engine
            .create_proposal(ngo(), vec!["stage 4".to_string()], vec![100_000], 6 * DAY)
            .unwrap();
        engine.vote(voter, late, 4, 8 * DAY).unwrap();
        assert_eq!(engine.reputation_tier(&voter), ReputationTier::Trusted);

        // 5 fresh votes at 8% discount: floor(25 * 0.92) = 23
        let fresh = engine
            .create_proposal(ngo(), vec!["fresh".to_string()], vec![100_000], 8 * DAY)
            .unwrap();
        let receipt = engine.vote(voter, fresh, 5, 8 * DAY + 10).unwrap();
        assert_eq!(receipt.cost, 23);
    }

    #[test]
    fn test_single_vote_floor_charges_one() {
        let voter = addr(2);
        let mut engine = setup();
        engine.deposit(voter, 10_000, 0).unwrap();

        // Reach the trusted tier as above
        let mut ids = Vec::new();
        for n in 0..4 {
            ids.push(
                engine
                    .create_proposal(ngo(), vec![format!("m{}", n)], vec![100_000], 0)
                    .unwrap(),
            );
        }
        engine.vote(voter, ids[0], 4, 0).unwrap();
        engine.vote(voter, ids[1], 4, 2 * DAY).unwrap();
        engine.vote(voter, ids[2], 4, 4 * DAY).unwrap();
        engine.vote(voter, ids[3], 4, 6 * DAY).unwrap();
        let late = engine
            .create_proposal(ngo(), vec!["m4".to_string()], vec![100_000], 6 * DAY)
            .unwrap();
        engine.vote(voter, late, 4, 8 * DAY).unwrap();
        assert_eq!(engine.reputation_tier(&voter), ReputationTier::Trusted);

        // A discounted first vote would cost floor(1 * 0.92) = 0;
        // the undiscounted 1 is charged instead
        let fresh = engine
            .create_proposal(ngo(), vec!["fresh".to_string()], vec![100_000], 8 * DAY)
            .unwrap();
        let balance_before = engine.credit_balance(&voter);
        let receipt = engine.vote(voter, fresh, 1, 8 * DAY + 10).unwrap();
        assert_eq!(receipt.cost, 1);
        assert_eq!(engine.credit_balance(&voter), balance_before - 1);
    }

    #[test]
    fn test_kill_proposal_flow() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);

        // Admin role required
        let err = engine.kill_proposal(addr(9), id, WINDOW).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));

        // Too early
        let err = engine.kill_proposal(admin(), id, WINDOW - 1).unwrap_err();
        assert!(matches!(err, EngineError::NotExpired { .. }));

        engine.kill_proposal(admin(), id, WINDOW).unwrap();
        assert_eq!(
            engine.vote(voter, id, 1, WINDOW + 1).unwrap_err(),
            EngineError::ProposalNotValid(id)
        );
    }

    #[test]
    fn test_queue_failure_recovered_by_reprocess() {
        let voter = addr(2);
        let mut engine = setup();
        // Mint-rich, pool-poor: 1 unit deposited at 1_000x mints 1_000 credits
        engine.set_mint_rate(admin(), 10_000_000).unwrap();
        engine.deposit(voter, 1, 0).unwrap();
        assert_eq!(engine.credit_balance(&voter), 1_000);
        assert_eq!(engine.treasury().pool_balance(), 1);

        let id = engine
            .create_proposal(ngo(), vec!["wells".to_string()], vec![500], 0)
            .unwrap();

        // Threshold crossed but the pool cannot cover 500: released, unqueued
        let receipt = engine.vote(voter, id, 5, 10).unwrap();
        assert_eq!(receipt.released, vec![0]);
        let proposal = engine.proposal(id).unwrap();
        assert!(proposal.milestones[0].released);
        assert!(proposal.milestones[0].timelock_id.is_none());

        // Pool refilled; admin reprocesses and the transfer gets queued
        engine.set_mint_rate(admin(), 10_000).unwrap();
        engine.deposit(addr(3), 2_000, 20).unwrap();
        let released = engine.reprocess_milestones(admin(), id, 30).unwrap();
        assert!(released.is_empty()); // nothing newly released, only re-queued
        let timelock_id = engine.proposal(id).unwrap().milestones[0]
            .timelock_id
            .unwrap();
        assert_eq!(engine.treasury().timelock(timelock_id).unwrap().amount, 500);
    }

    #[test]
    fn test_reprocess_releases_once_tally_already_covers() {
        let voter = addr(2);
        let mut engine = setup();
        engine.deposit(voter, 10_000, 0).unwrap();
        engine.deposit(addr(3), 10_000, 0).unwrap();

        // Second stage is cheaper than the first: the cumulative tally
        // already covers it the moment stage 0 verifies
        let id = engine
            .create_proposal(
                ngo(),
                vec!["big dig".to_string(), "signage".to_string()],
                vec![1_000, 300],
                0,
            )
            .unwrap();

        engine.vote(voter, id, 10, 10).unwrap();
        assert_eq!(engine.milestone_flags(id, 0), Some((true, false)));
        assert_eq!(engine.milestone_flags(id, 1), Some((false, false)));

        let submission = engine
            .submit_proof(ngo(), id, 0, "ipfs://dig".to_string(), 20)
            .unwrap();
        engine
            .review_proof(oracle_admin(), submission, true, None, 30)
            .unwrap();

        // No new vote needed
        let released = engine.reprocess_milestones(admin(), id, 40).unwrap();
        assert_eq!(released, vec![1]);
        assert!(engine.proposal(id).unwrap().is_fully_funded());
    }

    #[test]
    fn test_reprocess_requires_admin() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);
        let err = engine.reprocess_milestones(addr(9), id, 10).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
    }

    #[test]
    fn test_events_cover_the_flow() {
        let voter = addr(2);
        let (mut engine, id) = setup_with_proposal(voter, 100);
        engine.deposit(addr(3), 2_000, 0).unwrap();
        engine.drain_events();

        engine.vote(voter, id, 5, 10).unwrap();

        let events = engine.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::VoteCast { proposal, votes: 5, cost: 25, .. } if *proposal == id
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::MilestoneReleased { proposal, milestone: 0, amount: 500, timelock_id: Some(_) } if *proposal == id
        )));
    }

    #[test]
    fn test_two_voters_share_a_tally() {
        let (mut engine, id) = setup_with_proposal(addr(2), 100);
        engine.deposit(addr(3), 2_000, 0).unwrap();
        engine.deposit(addr(4), 100, 0).unwrap();

        engine.vote(addr(2), id, 3, 10).unwrap();
        // The second voter's 2 votes cross the 5-vote threshold
        let receipt = engine.vote(addr(4), id, 2, 20).unwrap();
        assert_eq!(receipt.cost, 4); // own position: 0 -> 2
        assert_eq!(receipt.proposal_total, 5);
        assert_eq!(receipt.released, vec![0]);
    }
}
