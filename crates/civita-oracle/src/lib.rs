//! Civita Oracle - External attestation registries.
//!
//! Two collaborators the funding engine consults but does not own:
//! - The beneficiary allowlist (who may open funding proposals)
//! - The proof registry (who attested which milestone, and how review went)
//!
//! Off-chain documents are referenced by opaque pointers; fetching or parsing
//! them is out of scope here.

pub mod beneficiary;
pub mod error;
pub mod proof;

pub use beneficiary::{BeneficiaryRecord, BeneficiaryRegistry};
pub use error::OracleError;
pub use proof::{ProofRegistry, ProofSubmission, ReviewOutcome, SubmissionStatus};
