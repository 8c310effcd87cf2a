use civita_types::{Address, AuthError};
use thiserror::Error;

/// Errors from the beneficiary and proof registries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("Beneficiary {0:?} is already in the requested state")]
    AlreadyInTargetState(Address),

    #[error("Caller is not the registered beneficiary of proposal {0}")]
    NotOwner(u64),

    #[error("Proof pointer must not be empty")]
    InvalidProofPointer,

    #[error("Milestone {milestone} of proposal {proposal} already has an approved proof")]
    AlreadyApproved { proposal: u64, milestone: u32 },

    #[error("Submission not found: {0}")]
    NotFound(u64),

    #[error("Submission {0} was already processed")]
    AlreadyProcessed(u64),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),
}
