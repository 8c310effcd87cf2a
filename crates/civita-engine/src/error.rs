use civita_oracle::OracleError;
use civita_treasury::TreasuryError;
use civita_types::{Address, AuthError};
use thiserror::Error;

/// Errors from proposal lifecycle and voting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Vote count must be non-zero")]
    InvalidVotes,

    #[error("Proposal {0} does not exist, was killed, or has expired")]
    ProposalNotValid(u64),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Proposal {0} is fully funded")]
    ProposalFullyFunded(u64),

    #[error("Milestone {milestone} of proposal {proposal} awaits verification")]
    PriorMilestoneUnverified { proposal: u64, milestone: u32 },

    #[error("Insufficient credits: have {have}, need {need}")]
    InsufficientCredits { have: u128, need: u128 },

    #[error("Beneficiary {0:?} is not allowlisted")]
    UnauthorizedBeneficiary(Address),

    #[error("Invalid milestones: {0}")]
    InvalidMilestones(String),

    #[error("Proposal {id} does not expire until {expires_at}")]
    NotExpired { id: u64, expires_at: u64 },

    #[error("Milestone {milestone} out of range for proposal {proposal}")]
    MilestoneOutOfRange { proposal: u64, milestone: u32 },

    #[error("Milestone {milestone} of proposal {proposal} is not released yet")]
    MilestoneNotReleased { proposal: u64, milestone: u32 },

    #[error("Arithmetic overflow in cost calculation")]
    CostOverflow,

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    Treasury(#[from] TreasuryError),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}
