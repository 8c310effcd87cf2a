//! Civita Engine - Credit-weighted charitable funding.
//!
//! This crate provides:
//! - Proposal and milestone lifecycle with a fixed validity window
//! - Quadratic vote pricing with reputation discounts
//! - Milestone release gated on vote thresholds and proof verification
//! - Timelocked disbursement wiring into the treasury
//! - A lock-guarded service facade for concurrent callers

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod proposal;
pub mod reputation;
pub mod service;
pub mod voting;

pub use config::EngineConfig;
pub use engine::{VoteReceipt, VoterLedgerEntry, VotingEngine};
pub use error::EngineError;
pub use events::{EngineEvent, EventLog};
pub use proposal::{Milestone, Proposal, ProposalRegistry, ProposalStatus};
pub use reputation::{ReputationBook, ReputationRecord, ReputationTier};
pub use service::EngineService;
pub use voting::{charge, integer_sqrt, marginal_cost, max_votes_from_budget};
