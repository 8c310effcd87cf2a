use civita_types::AuthError;
use thiserror::Error;

/// Errors from treasury custody and the credit ledger.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreasuryError {
    #[error("Deposit amount must be non-zero")]
    ZeroDeposit,

    #[error("Mint rate is zero; deposits are disabled")]
    ZeroMintRate,

    #[error("Base currency must enter custody through deposit")]
    DirectDepositNotAllowed,

    #[error("Transfer amount must be non-zero")]
    ZeroAmount,

    #[error("Eta {eta} is sooner than earliest allowed {earliest}")]
    EtaTooSoon { eta: u64, earliest: u64 },

    #[error("Timelock entry not found: {0}")]
    NotFound(u64),

    #[error("Timelock entry {id} not due until {eta}")]
    NotYetDue { id: u64, eta: u64 },

    #[error("Timelock entry {0} was already executed")]
    AlreadyExecuted(u64),

    #[error("Timelock entry {0} expired past its grace window")]
    Expired(u64),

    #[error("Insufficient pool funds: available {available}, requested {requested}")]
    InsufficientFunds { available: u128, requested: u128 },

    #[error("Insufficient credits: have {have}, need {need}")]
    InsufficientCredits { have: u128, need: u128 },

    #[error("Amount overflow")]
    Overflow,

    #[error(transparent)]
    Unauthorized(#[from] AuthError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TreasuryError::EtaTooSoon {
            eta: 100,
            earliest: 200,
        };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("200"));
    }
}
