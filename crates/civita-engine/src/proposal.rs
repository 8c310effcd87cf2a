//! Proposal and milestone lifecycle.
//!
//! Proposals carry an ordered list of milestones; milestone i may only be
//! released after milestone i-1 is both released and verified. Proposals
//! expire after a fixed window and can then be killed by an admin.

use std::collections::{BTreeSet, HashMap};

use civita_types::Address;

use crate::error::EngineError;

/// Observable proposal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    /// Current milestone is accepting votes
    Voting,
    /// Current milestone's predecessor awaits proof verification
    AwaitingVerification,
    /// All milestones released; terminal
    FullyFunded,
    /// Validity window elapsed
    Expired,
    /// Killed by an admin after expiry; terminal
    Killed,
}

/// A funding stage of a proposal.
#[derive(Debug, Clone)]
pub struct Milestone {
    /// What the stage delivers
    pub description: String,
    /// Requested base-currency amount
    pub amount: u128,
    /// Cumulative proposal votes required to release this stage
    pub vote_threshold: u128,
    /// Set when the vote tally crosses the threshold
    pub released: bool,
    /// Set only by an approved proof review
    pub verified: bool,
    pub released_at: Option<u64>,
    /// Timelock entry carrying this stage's funds, once queued
    pub timelock_id: Option<u64>,
}

impl Milestone {
    fn new(description: String, amount: u128, vote_scale: u128) -> Self {
        // Threshold floors at 1 so no stage releases without votes
        let vote_threshold = (amount / vote_scale).max(1);
        Self {
            description,
            amount,
            vote_threshold,
            released: false,
            verified: false,
            released_at: None,
            timelock_id: None,
        }
    }
}

/// A funding proposal.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: u64,
    pub beneficiary: Address,
    pub milestones: Vec<Milestone>,
    pub created_at: u64,
    pub expires_at: u64,
    /// Cleared by an admin kill
    pub valid: bool,
    /// Index of the milestone currently accepting votes; equals
    /// `milestones.len()` once fully funded
    pub next_milestone: usize,
    /// Cumulative votes cast across all voters
    pub total_votes: u128,
    /// Cumulative credits burned paying for those votes
    pub total_credits_burned: u128,
    pub funded_at: Option<u64>,
}

impl Proposal {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn is_fully_funded(&self) -> bool {
        self.next_milestone >= self.milestones.len()
    }

    /// Milestone currently accepting votes.
    pub fn current_milestone(&self) -> Option<&Milestone> {
        self.milestones.get(self.next_milestone)
    }

    /// Ensure the proposal can accept votes at `now`.
    ///
    /// Checks validity, expiry, remaining milestones, and the prior-stage
    /// verification gate, in that order.
    pub fn check_votable(&self, now: u64) -> Result<(), EngineError> {
        if !self.valid || self.is_expired(now) {
            return Err(EngineError::ProposalNotValid(self.id));
        }
        if self.is_fully_funded() {
            return Err(EngineError::ProposalFullyFunded(self.id));
        }
        if self.next_milestone > 0 {
            let prior = self.next_milestone - 1;
            if !self.milestones[prior].verified {
                return Err(EngineError::PriorMilestoneUnverified {
                    proposal: self.id,
                    milestone: prior as u32,
                });
            }
        }
        Ok(())
    }

    /// Observable status at `now`.
    pub fn status(&self, now: u64) -> ProposalStatus {
        if !self.valid {
            return ProposalStatus::Killed;
        }
        if self.is_fully_funded() {
            return ProposalStatus::FullyFunded;
        }
        if self.is_expired(now) {
            return ProposalStatus::Expired;
        }
        if self.next_milestone > 0 && !self.milestones[self.next_milestone - 1].verified {
            return ProposalStatus::AwaitingVerification;
        }
        ProposalStatus::Voting
    }
}

/// Registry of proposals with a monotonically increasing id sequence.
#[derive(Debug)]
pub struct ProposalRegistry {
    proposals: HashMap<u64, Proposal>,
    active: BTreeSet<u64>,
    next_id: u64,
    window_secs: u64,
    vote_scale: u128,
}

impl ProposalRegistry {
    pub fn new(window_secs: u64, vote_scale: u64) -> Self {
        Self {
            proposals: HashMap::new(),
            active: BTreeSet::new(),
            next_id: 1,
            window_secs,
            vote_scale: vote_scale as u128,
        }
    }

    /// Create a proposal for an (already allowlist-checked) beneficiary.
    ///
    /// Descriptions and amounts pair up positionally; both must be non-empty
    /// and of equal length, and every amount non-zero.
    pub fn create(
        &mut self,
        beneficiary: Address,
        descriptions: Vec<String>,
        amounts: Vec<u128>,
        now: u64,
    ) -> Result<u64, EngineError> {
        if descriptions.is_empty() || descriptions.len() != amounts.len() {
            return Err(EngineError::InvalidMilestones(format!(
                "got {} descriptions and {} amounts",
                descriptions.len(),
                amounts.len()
            )));
        }
        if amounts.iter().any(|amount| *amount == 0) {
            return Err(EngineError::InvalidMilestones(
                "milestone amounts must be non-zero".to_string(),
            ));
        }

        let id = self.next_id;
        self.next_id += 1;

        let milestones = descriptions
            .into_iter()
            .zip(amounts)
            .map(|(description, amount)| Milestone::new(description, amount, self.vote_scale))
            .collect();

        self.proposals.insert(
            id,
            Proposal {
                id,
                beneficiary,
                milestones,
                created_at: now,
                expires_at: now.saturating_add(self.window_secs),
                valid: true,
                next_milestone: 0,
                total_votes: 0,
                total_credits_burned: 0,
                funded_at: None,
            },
        );
        self.active.insert(id);
        Ok(id)
    }

    /// Kill a proposal whose validity window has elapsed.
    pub fn kill(&mut self, id: u64, now: u64) -> Result<(), EngineError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(EngineError::ProposalNotFound(id))?;
        if !proposal.is_expired(now) {
            return Err(EngineError::NotExpired {
                id,
                expires_at: proposal.expires_at,
            });
        }
        proposal.valid = false;
        self.active.remove(&id);
        Ok(())
    }

    /// Drop a proposal from the active index without invalidating it
    /// (fully funded proposals stay readable).
    pub(crate) fn deactivate(&mut self, id: u64) {
        self.active.remove(&id);
    }

    pub fn get(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: u64) -> Option<&mut Proposal> {
        self.proposals.get_mut(&id)
    }

    /// Ids in the active index, ascending.
    pub fn active_ids(&self) -> Vec<u64> {
        self.active.iter().copied().collect()
    }

    /// (released, verified) flags for one milestone.
    pub fn milestone_flags(&self, id: u64, milestone: u32) -> Option<(bool, bool)> {
        self.proposals
            .get(&id)
            .and_then(|p| p.milestones.get(milestone as usize))
            .map(|m| (m.released, m.verified))
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}
