//! # Snapshot Persistence
//!
//! The gate's whole state is one JSON document:
//!
//! ```json
//! { "config": { ... }, "roles": { "proposer": ["council"] }, "ledger": { "min_delay": 172800, "operations": { ... } } }
//! ```
//!
//! Writes go to a sibling temporary file that is then renamed over the
//! snapshot, so an interrupted write never leaves a truncated file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use timelock_controller::{
    AuditTrail, LedgerSnapshot, RoleGrants, RoleRegistry, Timelock, TimelockBuilder,
    TimelockConfig, TracingSink,
};
use timelock_core::{ManualClock, Timestamp};
use timelock_state::OperationRegistry;

/// Everything the CLI persists between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub config: TimelockConfig,
    pub roles: RoleGrants,
    pub ledger: LedgerSnapshot,
}

/// A live gate opened from a [`StateFile`].
pub struct Session {
    pub gate: Timelock,
    pub roles: Arc<RoleRegistry>,
    /// Events committed during this session.
    pub trail: Arc<AuditTrail>,
}

impl StateFile {
    /// A fresh state: empty registry, roles seeded from `config`.
    pub fn create(config: TimelockConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let roles = RoleRegistry::bootstrap(&config.identity, &config.roles).grants();
        let ledger = LedgerSnapshot {
            min_delay: config.min_delay,
            operations: OperationRegistry::new(),
        };
        Ok(Self {
            config,
            roles,
            ledger,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "no state at {} (run `timelock init --config <file>` first)",
                path.display()
            );
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse state file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        tracing::debug!(path = %path.display(), "state saved");
        Ok(())
    }

    /// Build a gate over this state. `now` pins the clock.
    pub fn open(&self, now: Option<u64>) -> Result<Session> {
        let roles = Arc::new(RoleRegistry::from_grants(self.roles.clone()));
        let trail = Arc::new(AuditTrail::default());
        let mut builder = TimelockBuilder::new(self.config.clone())
            .with_snapshot(self.ledger.clone())
            .with_access_control(roles.clone())
            .with_sink(trail.clone())
            .with_sink(Arc::new(TracingSink));
        if let Some(secs) = now {
            builder = builder.with_clock(Arc::new(ManualClock::new(Timestamp::from_secs(secs))));
        }
        let gate = builder.build().context("failed to open timelock")?;
        Ok(Session { gate, roles, trail })
    }

    /// Fold the session's state back in.
    pub fn absorb(&mut self, session: &Session) {
        self.ledger = session.gate.snapshot();
        self.roles = session.roles.grants();
    }
}
