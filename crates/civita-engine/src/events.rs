//! Domain events.
//!
//! Published after each successful state mutation; consumers read or drain
//! the log. Emission also goes to `tracing` for operational visibility.

use civita_types::Address;

/// Events emitted by the voting engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ProposalCreated {
        proposal: u64,
        beneficiary: Address,
        milestones: usize,
        expires_at: u64,
    },
    VoteCast {
        proposal: u64,
        voter: Address,
        votes: u128,
        cost: u128,
        total_votes: u128,
    },
    MilestoneReleased {
        proposal: u64,
        milestone: u32,
        amount: u128,
        timelock_id: Option<u64>,
    },
    ProposalFullyFunded {
        proposal: u64,
    },
    ProposalKilled {
        proposal: u64,
    },
    ProofSubmitted {
        proposal: u64,
        milestone: u32,
        submission: u64,
    },
    ProofReviewed {
        proposal: u64,
        milestone: u32,
        submission: u64,
        approved: bool,
    },
    BeneficiaryApproved {
        beneficiary: Address,
    },
    BeneficiaryRevoked {
        beneficiary: Address,
    },
    Deposited {
        depositor: Address,
        amount: u128,
        credits: u128,
    },
    TransferExecuted {
        timelock: u64,
        recipient: Address,
        amount: u128,
    },
}

/// Append-only in-process event log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<EngineEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&mut self, event: EngineEvent) {
        tracing::debug!(?event, "event published");
        self.events.push(event);
    }

    /// All events since creation (or the last drain).
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Hand events to a consumer, clearing the log.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
