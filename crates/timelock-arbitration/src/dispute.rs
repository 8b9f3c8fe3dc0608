//! # Dispute Lifecycle
//!
//! ```text
//! NOT_DISPUTED ──open_dispute()──▶ DISPUTED ──resolve(RejectVeto)──▶ REJECTED
//!                                     │
//!                                     └──resolve(AcceptVeto)──▶ entry deleted
//! ```
//!
//! `REJECTED` is terminal: an operation whose veto failed can never be
//! disputed again, so the same operation cannot be held up by repeated vetoes.
//! Deletion on an accepted veto returns the id to unset, and the identical
//! operation may be proposed again.

use serde::{Deserialize, Serialize};

use timelock_core::OperationId;
use timelock_state::{DisputeStatus, OperationEntry, OperationRegistry};

use crate::error::ArbitrationError;

/// The arbiter's final decision on a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ruling {
    /// The veto stands: the operation is cancelled.
    AcceptVeto,
    /// The veto fails: the operation proceeds and cannot be disputed again.
    RejectVeto,
}

impl Ruling {
    /// Map a "veto upheld?" flag to a ruling.
    pub fn from_veto_upheld(upheld: bool) -> Self {
        if upheld {
            Self::AcceptVeto
        } else {
            Self::RejectVeto
        }
    }

    /// The canonical string name of this ruling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcceptVeto => "ACCEPT_VETO",
            Self::RejectVeto => "REJECT_VETO",
        }
    }
}

impl std::fmt::Display for Ruling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Ruling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "accept_veto" | "accept" => Ok(Self::AcceptVeto),
            "reject_veto" | "reject" => Ok(Self::RejectVeto),
            other => Err(format!("unknown ruling: {other}")),
        }
    }
}

/// A recorded dispute status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeTransition {
    /// The operation concerned.
    pub id: OperationId,
    /// Status before.
    pub from: DisputeStatus,
    /// Status after.
    pub to: DisputeStatus,
}

/// Outcome of a ruling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Veto accepted. Carries the entry as it was before deletion.
    Cancelled(OperationEntry),
    /// Veto rejected. The operation remains pending with status `REJECTED`.
    Cleared(DisputeTransition),
}

/// File a veto against a pending, undisputed operation.
///
/// # Errors
///
/// - [`ArbitrationError::NotPending`] if the operation is unset or done.
/// - [`ArbitrationError::AlreadyDisputedOrTerminal`] unless the status is
///   `NOT_DISPUTED`.
pub fn open_dispute(
    registry: &mut OperationRegistry,
    id: &OperationId,
) -> Result<DisputeTransition, ArbitrationError> {
    let ready_at = registry.ready_at(id);
    let entry = match registry.entry_mut(id) {
        Some(entry) if entry.ready_at.is_pending() => entry,
        _ => return Err(ArbitrationError::NotPending { id: *id, ready_at }),
    };
    if entry.dispute != DisputeStatus::NotDisputed {
        return Err(ArbitrationError::AlreadyDisputedOrTerminal {
            id: *id,
            status: entry.dispute,
        });
    }
    entry.dispute = DisputeStatus::Disputed;
    Ok(DisputeTransition {
        id: *id,
        from: DisputeStatus::NotDisputed,
        to: DisputeStatus::Disputed,
    })
}

/// Apply the arbiter's ruling to an open dispute.
///
/// # Errors
///
/// [`ArbitrationError::NotDisputed`] unless the status is `DISPUTED`.
pub fn resolve_dispute(
    registry: &mut OperationRegistry,
    id: &OperationId,
    ruling: Ruling,
) -> Result<Verdict, ArbitrationError> {
    let status = registry.dispute_status(id);
    // A done entry keeps its status, but it can never be DISPUTED: execution
    // refuses disputed operations.
    if status != DisputeStatus::Disputed || !registry.is_pending(id) {
        return Err(ArbitrationError::NotDisputed { id: *id, status });
    }
    match ruling {
        Ruling::AcceptVeto => {
            let ready_at = registry.ready_at(id);
            let removed = registry
                .remove_pending(id)
                .map_err(|_| ArbitrationError::NotPending { id: *id, ready_at })?;
            Ok(Verdict::Cancelled(removed))
        }
        Ruling::RejectVeto => {
            if let Some(entry) = registry.entry_mut(id) {
                entry.dispute = DisputeStatus::Rejected;
            }
            Ok(Verdict::Cleared(DisputeTransition {
                id: *id,
                from: DisputeStatus::Disputed,
                to: DisputeStatus::Rejected,
            }))
        }
    }
}
