//! Role-based authorization context.
//!
//! Privileged operations take the caller identity and check it against an
//! explicit role table. There is no ambient admin singleton: the context is
//! built at wiring time and passed into each call that needs it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::Address;

/// Privileged roles recognized across the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Operational administrator: proposal kills, emergency burn/disburse,
    /// mint-rate changes, milestone reprocessing.
    Admin,
    /// The voting engine itself: transfer queuing and vote-payment burns.
    Engine,
    /// Oracle administrator: beneficiary allowlist and proof review.
    OracleAdmin,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Engine => "engine",
            Role::OracleAdmin => "oracle-admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Authorization failure: the caller does not hold the required role.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("caller {caller:?} lacks required role '{role}'")]
pub struct AuthError {
    pub caller: Address,
    pub role: Role,
}

/// Explicit role table checked at the top of each privileged operation.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    roles: HashMap<Address, HashSet<Role>>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a role to a holder.
    pub fn grant(&mut self, holder: Address, role: Role) {
        self.roles.entry(holder).or_default().insert(role);
    }

    /// Revoke a role. Returns true if the holder had it.
    pub fn revoke(&mut self, holder: &Address, role: Role) -> bool {
        match self.roles.get_mut(holder) {
            Some(set) => set.remove(&role),
            None => false,
        }
    }

    pub fn has_role(&self, holder: &Address, role: Role) -> bool {
        self.roles
            .get(holder)
            .map(|set| set.contains(&role))
            .unwrap_or(false)
    }

    /// Check that `caller` holds `role`; rejected before any state change.
    pub fn require(&self, caller: &Address, role: Role) -> Result<(), AuthError> {
        if self.has_role(caller, role) {
            Ok(())
        } else {
            Err(AuthError {
                caller: *caller,
                role,
            })
        }
    }
}
