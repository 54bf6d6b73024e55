//! Explicit role table replacing modifier-style access guards.
//!
//! Every privileged engine operation starts with a `require` lookup against
//! this table and returns a typed `Unauthorized` error on failure.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

use super::UserId;

/// Capabilities a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Administrative surface: pauses, fees, treasury, roles, markets.
    Admin,
    /// May record resolutions.
    Oracle,
    /// May submit order matches for settlement.
    Matcher,
    /// May record resolutions when the oracle cannot.
    EmergencyResolver,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Oracle => "oracle",
            Role::Matcher => "matcher",
            Role::EmergencyResolver => "emergency-resolver",
        };
        write!(f, "{name}")
    }
}

/// Grants of roles to users.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    grants: HashMap<UserId, HashSet<Role>>,
}

impl RoleTable {
    /// Create an empty role table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a role to a user. Granting twice is a no-op.
    pub fn grant(&mut self, user: UserId, role: Role) {
        self.grants.entry(user).or_default().insert(role);
    }

    /// Revoke a role from a user. Revoking an absent grant is a no-op.
    pub fn revoke(&mut self, user: &UserId, role: Role) {
        if let Some(roles) = self.grants.get_mut(user) {
            roles.remove(&role);
        }
    }

    /// Returns true if the user holds the role.
    #[must_use]
    pub fn has(&self, user: &UserId, role: Role) -> bool {
        self.grants.get(user).is_some_and(|r| r.contains(&role))
    }

    /// Require the user to hold the role.
    pub fn require(&self, user: &UserId, role: Role) -> Result<(), LedgerError> {
        if self.has(user, role) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                user: user.clone(),
                required: role,
            })
        }
    }

    /// Require the user to hold any of the given roles.
    pub fn require_any(&self, user: &UserId, roles: &[Role]) -> Result<(), LedgerError> {
        if roles.iter().any(|r| self.has(user, *r)) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                user: user.clone(),
                required: roles[0],
            })
        }
    }
}
