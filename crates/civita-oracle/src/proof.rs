//! Proof-of-completion registry.
//!
//! Beneficiaries submit attestation pointers for funded milestones; an
//! oracle admin approves or rejects each submission. Approval happens at
//! most once per (proposal, milestone); rejected submissions may be
//! resubmitted.

use std::collections::{HashMap, HashSet};

use civita_types::{Address, AuthContext, Role};

use crate::error::OracleError;

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Waiting for review
    Pending,
    /// Approved; the milestone counts as verified
    Approved,
    /// Rejected; the beneficiary may resubmit
    Rejected,
}

/// A single attestation submission.
#[derive(Debug, Clone)]
pub struct ProofSubmission {
    pub id: u64,
    pub proposal_id: u64,
    pub milestone: u32,
    pub submitter: Address,
    /// Off-chain proof artifact pointer (stored, never resolved)
    pub proof_pointer: String,
    pub status: SubmissionStatus,
    pub submitted_at: u64,
    pub reviewed_at: Option<u64>,
    /// Reviewer note, kept for rejections
    pub reason: Option<String>,
}

/// Result of a review decision, used to drive milestone verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub submission_id: u64,
    pub proposal_id: u64,
    pub milestone: u32,
    pub approved: bool,
}

/// Registry of attestation submissions and review decisions.
#[derive(Debug)]
pub struct ProofRegistry {
    submissions: HashMap<u64, ProofSubmission>,
    /// (proposal, milestone) pairs with an approved submission
    approved: HashSet<(u64, u32)>,
    next_id: u64,
}

impl ProofRegistry {
    pub fn new() -> Self {
        Self {
            submissions: HashMap::new(),
            approved: HashSet::new(),
            next_id: 1,
        }
    }

    /// Record a new attestation submission.
    ///
    /// `owner` is the registered beneficiary of the proposal; only they may
    /// submit. A pair that already has an approved submission cannot be
    /// attested again.
    pub fn submit(
        &mut self,
        caller: Address,
        owner: Address,
        proposal_id: u64,
        milestone: u32,
        proof_pointer: String,
        now: u64,
    ) -> Result<u64, OracleError> {
        if caller != owner {
            return Err(OracleError::NotOwner(proposal_id));
        }
        if proof_pointer.trim().is_empty() {
            return Err(OracleError::InvalidProofPointer);
        }
        if self.approved.contains(&(proposal_id, milestone)) {
            return Err(OracleError::AlreadyApproved {
                proposal: proposal_id,
                milestone,
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.submissions.insert(
            id,
            ProofSubmission {
                id,
                proposal_id,
                milestone,
                submitter: caller,
                proof_pointer,
                status: SubmissionStatus::Pending,
                submitted_at: now,
                reviewed_at: None,
                reason: None,
            },
        );
        tracing::debug!(
            "proof submission {} recorded for proposal {} milestone {}",
            id,
            proposal_id,
            milestone
        );
        Ok(id)
    }

    /// Review a pending submission. Requires the oracle-admin role.
    ///
    /// A submission is processed at most once; repeats fail.
    pub fn review(
        &mut self,
        auth: &AuthContext,
        caller: Address,
        submission_id: u64,
        approved: bool,
        reason: Option<String>,
        now: u64,
    ) -> Result<ReviewOutcome, OracleError> {
        auth.require(&caller, Role::OracleAdmin)?;

        let (proposal_id, milestone, status) = self
            .submissions
            .get(&submission_id)
            .map(|s| (s.proposal_id, s.milestone, s.status))
            .ok_or(OracleError::NotFound(submission_id))?;

        if status != SubmissionStatus::Pending {
            return Err(OracleError::AlreadyProcessed(submission_id));
        }
        // A pair can only ever be approved once, even across submissions
        if approved && self.approved.contains(&(proposal_id, milestone)) {
            return Err(OracleError::AlreadyApproved {
                proposal: proposal_id,
                milestone,
            });
        }

        if let Some(submission) = self.submissions.get_mut(&submission_id) {
            submission.status = if approved {
                SubmissionStatus::Approved
            } else {
                SubmissionStatus::Rejected
            };
            submission.reviewed_at = Some(now);
            submission.reason = reason;
        }
        if approved {
            self.approved.insert((proposal_id, milestone));
            tracing::info!(
                "proof {} approved for proposal {} milestone {}",
                submission_id,
                proposal_id,
                milestone
            );
        } else {
            tracing::info!(
                "proof {} rejected for proposal {} milestone {}",
                submission_id,
                proposal_id,
                milestone
            );
        }

        Ok(ReviewOutcome {
            submission_id,
            proposal_id,
            milestone,
            approved,
        })
    }

    /// True once an approved submission exists for the pair.
    pub fn is_attested(&self, proposal_id: u64, milestone: u32) -> bool {
        self.approved.contains(&(proposal_id, milestone))
    }

    pub fn get(&self, id: u64) -> Option<&ProofSubmission> {
        self.submissions.get(&id)
    }

    /// Submissions for one proposal, oldest first.
    pub fn for_proposal(&self, proposal_id: u64) -> Vec<&ProofSubmission> {
        let mut submissions: Vec<&ProofSubmission> = self
            .submissions
            .values()
            .filter(|s| s.proposal_id == proposal_id)
            .collect();
        submissions.sort_by_key(|s| s.id);
        submissions
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }
}

impl Default for ProofRegistry {
    fn default() -> Self {
        Self::new()
    }
}
