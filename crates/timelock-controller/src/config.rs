//! # Gate Configuration
//!
//! Loaded from YAML:
//!
//! ```yaml
//! identity: treasury-timelock
//! min_delay: 172800            # seconds
//! delay_bounds:                # optional, defaults to 2 days .. 30 days
//!   minimum: 172800
//!   maximum: 2592000
//! roles:
//!   proposers: [council]
//!   executors: ["*"]
//!   vetoers: [guardian]
//!   arbiters: [supreme-court]
//!   cancellors: [council]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use timelock_core::{Principal, SECONDS_PER_DAY};

use crate::access::Role;
use crate::error::TimelockError;

/// Default lower bound on the minimum delay: 2 days.
pub const MINIMUM_DELAY: u64 = 2 * SECONDS_PER_DAY;

/// Default upper bound on the minimum delay: 30 days.
pub const MAXIMUM_DELAY: u64 = 30 * SECONDS_PER_DAY;

// ── Delay Bounds ────────────────────────────────────────────────────────────

/// Inclusive range the minimum delay must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayBounds {
    /// Smallest permitted minimum delay, in seconds.
    pub minimum: u64,
    /// Largest permitted minimum delay, in seconds.
    pub maximum: u64,
}

impl Default for DelayBounds {
    fn default() -> Self {
        Self {
            minimum: MINIMUM_DELAY,
            maximum: MAXIMUM_DELAY,
        }
    }
}

impl DelayBounds {
    /// Whether `delay` lies within the bounds.
    pub fn contains(&self, delay: u64) -> bool {
        (self.minimum..=self.maximum).contains(&delay)
    }

    /// Reject `delay` unless it lies within the bounds.
    pub fn check(&self, delay: u64) -> Result<(), TimelockError> {
        if self.contains(delay) {
            Ok(())
        } else {
            Err(TimelockError::DelayOutOfBounds {
                delay,
                minimum: self.minimum,
                maximum: self.maximum,
            })
        }
    }
}

// ── Role Assignments ────────────────────────────────────────────────────────

/// Initial role grants, one list per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleAssignments {
    pub admins: Vec<Principal>,
    pub proposers: Vec<Principal>,
    pub executors: Vec<Principal>,
    pub vetoers: Vec<Principal>,
    pub arbiters: Vec<Principal>,
    pub cancellors: Vec<Principal>,
}

impl RoleAssignments {
    /// Iterate `(role, principals)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &[Principal])> {
        [
            (Role::Admin, self.admins.as_slice()),
            (Role::Proposer, self.proposers.as_slice()),
            (Role::Executor, self.executors.as_slice()),
            (Role::Veto, self.vetoers.as_slice()),
            (Role::Arbiter, self.arbiters.as_slice()),
            (Role::Cancellor, self.cancellors.as_slice()),
        ]
        .into_iter()
    }
}

// ── TimelockConfig ──────────────────────────────────────────────────────────

/// Construction parameters for a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimelockConfig {
    /// The gate's own principal. Calls addressed here are self-calls.
    pub identity: Principal,
    /// Initial minimum delay in seconds.
    pub min_delay: u64,
    #[serde(default)]
    pub delay_bounds: DelayBounds,
    #[serde(default)]
    pub roles: RoleAssignments,
}

impl TimelockConfig {
    /// A configuration with default bounds and no role grants.
    pub fn new(identity: Principal, min_delay: u64) -> Self {
        Self {
            identity,
            min_delay,
            delay_bounds: DelayBounds::default(),
            roles: RoleAssignments::default(),
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, TimelockError> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| TimelockError::Config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path(path: &Path) -> Result<Self, TimelockError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TimelockError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), TimelockError> {
        if self.identity.is_anyone() {
            return Err(TimelockError::Config(
                "the wildcard principal cannot be the gate identity".into(),
            ));
        }
        if self.delay_bounds.minimum > self.delay_bounds.maximum {
            return Err(TimelockError::Config(format!(
                "delay bounds inverted: minimum {}s > maximum {}s",
                self.delay_bounds.minimum, self.delay_bounds.maximum
            )));
        }
        self.delay_bounds.check(self.min_delay)
    }
}
