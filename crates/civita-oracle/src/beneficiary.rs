//! Beneficiary allowlist.
//!
//! Certifies which recipients are eligible to open funding proposals. Each
//! entry carries a pointer to an off-chain detail document; the pointer is
//! stored and returned, never resolved.

use std::collections::HashMap;

use civita_types::{Address, AuthContext, Role};

use crate::error::OracleError;

/// Allowlist entry for an approved beneficiary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeneficiaryRecord {
    /// Off-chain detail document pointer
    pub detail_pointer: String,
    /// When the beneficiary was approved (Unix seconds)
    pub approved_at: u64,
}

/// Allowlist of eligible fund recipients.
#[derive(Debug, Default)]
pub struct BeneficiaryRegistry {
    allowlist: HashMap<Address, BeneficiaryRecord>,
}

impl BeneficiaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Approve a beneficiary. Requires the oracle-admin role.
    ///
    /// Fails if the beneficiary is already approved.
    pub fn approve(
        &mut self,
        auth: &AuthContext,
        caller: Address,
        beneficiary: Address,
        detail_pointer: String,
        now: u64,
    ) -> Result<(), OracleError> {
        auth.require(&caller, Role::OracleAdmin)?;

        if self.allowlist.contains_key(&beneficiary) {
            return Err(OracleError::AlreadyInTargetState(beneficiary));
        }

        self.allowlist.insert(
            beneficiary,
            BeneficiaryRecord {
                detail_pointer,
                approved_at: now,
            },
        );
        tracing::info!("beneficiary {} approved", beneficiary);
        Ok(())
    }

    /// Revoke a previously approved beneficiary. Requires the oracle-admin
    /// role. Fails if the beneficiary is not currently approved.
    pub fn revoke(
        &mut self,
        auth: &AuthContext,
        caller: Address,
        beneficiary: Address,
    ) -> Result<(), OracleError> {
        auth.require(&caller, Role::OracleAdmin)?;

        if self.allowlist.remove(&beneficiary).is_none() {
            return Err(OracleError::AlreadyInTargetState(beneficiary));
        }
        tracing::info!("beneficiary {} revoked", beneficiary);
        Ok(())
    }

    /// Eligibility check used as the proposal-creation gate.
    pub fn is_approved(&self, beneficiary: &Address) -> bool {
        self.allowlist.contains_key(beneficiary)
    }

    /// Stored detail pointer for an approved beneficiary.
    pub fn detail_pointer(&self, beneficiary: &Address) -> Option<&str> {
        self.allowlist
            .get(beneficiary)
            .map(|record| record.detail_pointer.as_str())
    }

    pub fn get(&self, beneficiary: &Address) -> Option<&BeneficiaryRecord> {
        self.allowlist.get(beneficiary)
    }

    pub fn len(&self) -> usize {
        self.allowlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowlist.is_empty()
    }
}
