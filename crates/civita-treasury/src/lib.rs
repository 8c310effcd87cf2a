//! Civita Treasury - Custody and credit issuance.
//!
//! This crate provides:
//! - The credit ledger interface and an in-memory implementation
//! - The custodial pool: deposits mint voting credits at a configured rate
//! - Timelocked transfer queuing and exactly-once execution
//! - Admin emergency burn and disbursement paths

pub mod error;
pub mod ledger;
pub mod timelock;
pub mod treasury;

pub use error::TreasuryError;
pub use ledger::{CreditLedger, InMemoryLedger};
pub use timelock::{TimelockEntry, TimelockQueue, TimelockStatus};
pub use treasury::{
    Treasury, TreasuryConfig, TreasuryTransaction, TransactionKind, BPS_DENOMINATOR,
};
