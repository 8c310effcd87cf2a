//! Voter reputation and discount tiers.
//!
//! Reputation is global per voter (not per proposal) and never deleted. The
//! discount tier is recomputed from the raw record at each cost calculation;
//! nothing precomputed is stored. Sustained, diversified engagement earns a
//! discount, while high per-session volume caps the achievable tier.

use std::collections::{BTreeSet, HashMap};

use civita_types::Address;

const SECONDS_PER_DAY: u64 = 86_400;

// Tier thresholds. The avg-votes-per-session caps keep a single large
// holder from buying a tier with a handful of huge sessions.
const TRUSTED_MIN_SESSIONS: u64 = 5;
const TRUSTED_MIN_PROPOSALS: usize = 4;
const TRUSTED_MIN_DAYS_ACTIVE: u64 = 7;
const TRUSTED_MAX_AVG_VOTES: u128 = 5;

const REGULAR_MIN_SESSIONS: u64 = 3;
const REGULAR_MIN_PROPOSALS: usize = 3;
const REGULAR_MIN_DAYS_ACTIVE: u64 = 3;
const REGULAR_MAX_AVG_VOTES: u128 = 7;

/// Discount tier derived from participation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReputationTier {
    /// No history worth a discount
    None,
    /// Sustained engagement (4% discount)
    Regular,
    /// Long-running, diversified engagement (8% discount)
    Trusted,
}

impl ReputationTier {
    /// Discount in basis points off the marginal vote cost.
    pub fn discount_bps(&self) -> u16 {
        match self {
            ReputationTier::None => 0,
            ReputationTier::Regular => 400,
            ReputationTier::Trusted => 800,
        }
    }
}

/// Per-voter participation history.
#[derive(Debug, Clone)]
pub struct ReputationRecord {
    /// Successful vote calls, any proposal
    pub sessions: u64,
    /// Distinct proposals voted on
    pub proposals: BTreeSet<u64>,
    pub first_vote_at: u64,
    pub last_vote_at: u64,
    /// Cumulative votes cast
    pub total_votes: u128,
}

impl ReputationRecord {
    fn new(proposal_id: u64, votes: u128, now: u64) -> Self {
        let mut proposals = BTreeSet::new();
        proposals.insert(proposal_id);
        Self {
            sessions: 1,
            proposals,
            first_vote_at: now,
            last_vote_at: now,
            total_votes: votes,
        }
    }

    fn record(&mut self, proposal_id: u64, votes: u128, now: u64) {
        self.sessions += 1;
        self.proposals.insert(proposal_id);
        self.last_vote_at = now;
        self.total_votes = self.total_votes.saturating_add(votes);
    }

    /// Whole days between first and most recent vote.
    pub fn days_active(&self) -> u64 {
        self.last_vote_at.saturating_sub(self.first_vote_at) / SECONDS_PER_DAY
    }

    /// Average votes per session, floored.
    pub fn avg_votes_per_session(&self) -> u128 {
        if self.sessions == 0 {
            return 0;
        }
        self.total_votes / self.sessions as u128
    }

    /// Tier derived from the current record.
    pub fn tier(&self) -> ReputationTier {
        let days = self.days_active();
        let avg = self.avg_votes_per_session();
        let distinct = self.proposals.len();

        if self.sessions >= TRUSTED_MIN_SESSIONS
            && distinct >= TRUSTED_MIN_PROPOSALS
            && days >= TRUSTED_MIN_DAYS_ACTIVE
            && avg <= TRUSTED_MAX_AVG_VOTES
        {
            return ReputationTier::Trusted;
        }
        if self.sessions >= REGULAR_MIN_SESSIONS
            && distinct >= REGULAR_MIN_PROPOSALS
            && days >= REGULAR_MIN_DAYS_ACTIVE
            && avg <= REGULAR_MAX_AVG_VOTES
        {
            return ReputationTier::Regular;
        }
        ReputationTier::None
    }
}

/// All voters' reputation records.
#[derive(Debug, Default)]
pub struct ReputationBook {
    records: HashMap<Address, ReputationRecord>,
}

impl ReputationBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tier as of the record's current state; voters with no history are
    /// `None`.
    pub fn tier_of(&self, voter: &Address) -> ReputationTier {
        self.records
            .get(voter)
            .map(|record| record.tier())
            .unwrap_or(ReputationTier::None)
    }

    /// Record a successful vote call.
    pub fn record_vote(&mut self, voter: Address, proposal_id: u64, votes: u128, now: u64) {
        match self.records.get_mut(&voter) {
            Some(record) => record.record(proposal_id, votes, now),
            None => {
                self.records
                    .insert(voter, ReputationRecord::new(proposal_id, votes, now));
            }
        }
    }

    pub fn get(&self, voter: &Address) -> Option<&ReputationRecord> {
        self.records.get(voter)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
