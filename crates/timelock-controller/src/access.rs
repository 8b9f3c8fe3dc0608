//! # Role-Based Access Control
//!
//! The gate consumes authorization through the [`AccessControl`] trait: one
//! question, "does this principal hold this role?". [`RoleRegistry`] is the
//! in-memory implementation shipped with the crate.
//!
//! ## Wildcard Grants
//!
//! A role granted to [`Principal::anyone()`] (rendered `*`) is open: every
//! caller passes the check. This is how the executor role is usually made
//! public.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use timelock_core::Principal;

use crate::config::RoleAssignments;
use crate::error::TimelockError;

// ── Role ────────────────────────────────────────────────────────────────────

/// Roles recognised by the gate. Roles are independent; none implies another.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Grants and revokes every role.
    Admin,
    /// May schedule operations.
    Proposer,
    /// May execute ready operations.
    Executor,
    /// May dispute pending operations.
    Veto,
    /// Rules on disputes.
    Arbiter,
    /// May cancel pending operations.
    Cancellor,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Proposer,
        Role::Executor,
        Role::Veto,
        Role::Arbiter,
        Role::Cancellor,
    ];

    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Proposer => "proposer",
            Self::Executor => "executor",
            Self::Veto => "veto",
            Self::Arbiter => "arbiter",
            Self::Cancellor => "cancellor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

// ── AccessControl ───────────────────────────────────────────────────────────

/// Authorization service consulted by every gated entry point.
pub trait AccessControl: Send + Sync {
    /// Whether `principal` holds `role` through a direct grant.
    fn has_role(&self, role: Role, principal: &Principal) -> bool;

    /// Check that `principal` holds `role`, directly or through a wildcard
    /// grant.
    fn require_role(&self, role: Role, principal: &Principal) -> Result<(), TimelockError> {
        if self.has_role(role, principal) || self.has_role(role, &Principal::anyone()) {
            Ok(())
        } else {
            Err(TimelockError::Unauthorized {
                role,
                principal: principal.clone(),
            })
        }
    }
}

// ── RoleRegistry ────────────────────────────────────────────────────────────

/// Role membership table, serializable for snapshots.
pub type RoleGrants = BTreeMap<Role, BTreeSet<Principal>>;

/// In-memory role registry.
///
/// Grants and revocations require the admin role; any principal may renounce
/// its own roles.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    grants: RwLock<RoleGrants>,
}

impl RoleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a registry from configuration. `identity` always receives
    /// [`Role::Admin`], making the gate's own principal the root of role
    /// administration alongside any configured admins.
    pub fn bootstrap(identity: &Principal, assignments: &RoleAssignments) -> Self {
        let mut grants = RoleGrants::new();
        grants
            .entry(Role::Admin)
            .or_default()
            .insert(identity.clone());
        for (role, principals) in assignments.iter() {
            grants
                .entry(role)
                .or_default()
                .extend(principals.iter().cloned());
        }
        Self::from_grants(grants)
    }

    /// Restore a registry from a membership table.
    pub fn from_grants(grants: RoleGrants) -> Self {
        Self {
            grants: RwLock::new(grants),
        }
    }

    /// A copy of the membership table.
    pub fn grants(&self) -> RoleGrants {
        self.grants.read().clone()
    }

    /// Current members of `role`.
    pub fn members(&self, role: Role) -> Vec<Principal> {
        self.grants
            .read()
            .get(&role)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Grant `role` to `account`. Returns `false` if it was already held.
    pub fn grant_role(
        &self,
        admin: &Principal,
        role: Role,
        account: &Principal,
    ) -> Result<bool, TimelockError> {
        self.require_role(Role::Admin, admin)?;
        let added = self
            .grants
            .write()
            .entry(role)
            .or_default()
            .insert(account.clone());
        if added {
            tracing::info!(%role, %account, %admin, "role granted");
        }
        Ok(added)
    }

    /// Revoke `role` from `account`. Returns `false` if it was not held.
    pub fn revoke_role(
        &self,
        admin: &Principal,
        role: Role,
        account: &Principal,
    ) -> Result<bool, TimelockError> {
        self.require_role(Role::Admin, admin)?;
        let removed = self.remove(role, account);
        if removed {
            tracing::info!(%role, %account, %admin, "role revoked");
        }
        Ok(removed)
    }

    /// Drop `role` from the caller's own grants.
    pub fn renounce_role(&self, account: &Principal, role: Role) -> bool {
        let removed = self.remove(role, account);
        if removed {
            tracing::info!(%role, %account, "role renounced");
        }
        removed
    }

    fn remove(&self, role: Role, account: &Principal) -> bool {
        let mut grants = self.grants.write();
        let Some(set) = grants.get_mut(&role) else {
            return false;
        };
        let removed = set.remove(account);
        if set.is_empty() {
            grants.remove(&role);
        }
        removed
    }
}

impl AccessControl for RoleRegistry {
    fn has_role(&self, role: Role, principal: &Principal) -> bool {
        self.grants
            .read()
            .get(&role)
            .is_some_and(|set| set.contains(principal))
    }
}
