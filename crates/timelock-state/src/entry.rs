//! # Registry Entry
//!
//! The per-operation record and the pure predicates derived from it.

use serde::{Deserialize, Serialize};

use timelock_core::Timestamp;

// ── Ready-At ───────────────────────────────────────────────────────────

/// Readiness timestamp with two sentinel values.
///
/// | raw   | meaning                                   |
/// |-------|-------------------------------------------|
/// | `0`   | no operation with this id                 |
/// | `1`   | operation executed (done)                 |
/// | `> 1` | UNIX second at/after which it may execute |
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ReadyAt(u64);

impl ReadyAt {
    /// No operation.
    pub const UNSET: ReadyAt = ReadyAt(0);
    /// Operation executed.
    pub const DONE: ReadyAt = ReadyAt(1);

    /// Readiness at `at`. Returns `None` if `at` collides with a sentinel.
    pub fn at(at: Timestamp) -> Option<Self> {
        if at.secs() > Self::DONE.0 {
            Some(Self(at.secs()))
        } else {
            None
        }
    }

    /// The raw value, sentinels included.
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// `raw > 0`.
    pub fn exists(&self) -> bool {
        self.0 > Self::UNSET.0
    }

    /// `raw > 1`: scheduled and not yet executed, ready or not.
    pub fn is_pending(&self) -> bool {
        self.0 > Self::DONE.0
    }

    /// Pending and the waiting period has elapsed at `now`.
    pub fn is_ready(&self, now: Timestamp) -> bool {
        self.is_pending() && self.0 <= now.secs()
    }

    /// `raw == 1`.
    pub fn is_done(&self) -> bool {
        *self == Self::DONE
    }

    /// The ready time of a pending operation.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.is_pending().then(|| Timestamp::from_secs(self.0))
    }
}

impl std::fmt::Display for ReadyAt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::UNSET => f.write_str("unset"),
            Self::DONE => f.write_str("done"),
            Self(secs) => write!(f, "{}", Timestamp::from_secs(secs)),
        }
    }
}

// ── Dispute Status ─────────────────────────────────────────────────────

/// Where an operation stands in the dispute sub-machine.
///
/// Transitions only `NotDisputed → Disputed → Rejected`; an accepted veto
/// deletes the entry instead. The numeric codes are stable and exposed to
/// callers through [`DisputeStatus::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    /// No veto has been raised.
    #[default]
    NotDisputed,
    /// A veto is pending before the arbiter. Execution is blocked.
    Disputed,
    /// The arbiter rejected the veto. Terminal: the operation can never be
    /// disputed again.
    Rejected,
}

impl DisputeStatus {
    /// Stable numeric code: 0, 1, 2.
    pub fn code(&self) -> u8 {
        match self {
            Self::NotDisputed => 0,
            Self::Disputed => 1,
            Self::Rejected => 2,
        }
    }

    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotDisputed => "NOT_DISPUTED",
            Self::Disputed => "DISPUTED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Whether this status blocks execution.
    pub fn blocks_execution(&self) -> bool {
        matches!(self, Self::Disputed)
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Entry ──────────────────────────────────────────────────────────────

/// One registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationEntry {
    /// Readiness timestamp.
    pub ready_at: ReadyAt,
    /// Dispute sub-machine state.
    pub dispute: DisputeStatus,
}

impl OperationEntry {
    /// A freshly scheduled entry.
    pub fn scheduled(ready_at: ReadyAt) -> Self {
        Self {
            ready_at,
            dispute: DisputeStatus::NotDisputed,
        }
    }

    /// Summarise this entry at `now`.
    pub fn status(&self, now: Timestamp) -> OperationStatus {
        match self.ready_at {
            ReadyAt::UNSET => OperationStatus::Unset,
            ReadyAt::DONE => OperationStatus::Done,
            ready_at if ready_at.is_ready(now) => OperationStatus::Ready {
                ready_at,
                dispute: self.dispute,
            },
            ready_at => OperationStatus::Waiting {
                ready_at,
                dispute: self.dispute,
            },
        }
    }
}

/// A read-only view of an entry's lifecycle position at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OperationStatus {
    /// No operation with this id.
    Unset,
    /// Scheduled, waiting period not yet elapsed.
    Waiting {
        /// When it becomes ready.
        ready_at: ReadyAt,
        /// Dispute state.
        dispute: DisputeStatus,
    },
    /// Scheduled and executable once undisputed.
    Ready {
        /// When it became ready.
        ready_at: ReadyAt,
        /// Dispute state.
        dispute: DisputeStatus,
    },
    /// Executed.
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    #[test]
    fn sentinels_are_rejected_as_ready_times() {
        assert_eq!(ReadyAt::at(ts(0)), None);
        assert_eq!(ReadyAt::at(ts(1)), None);
        assert_eq!(ReadyAt::at(ts(2)).map(|r| r.raw()), Some(2));
    }

    #[test]
    fn predicates_follow_raw_value() {
        assert!(!ReadyAt::UNSET.exists());
        assert!(!ReadyAt::UNSET.is_pending());
        assert!(ReadyAt::DONE.exists());
        assert!(ReadyAt::DONE.is_done());
        assert!(!ReadyAt::DONE.is_pending());
        assert!(!ReadyAt::DONE.is_ready(ts(u64::MAX)));

        let r = ReadyAt::at(ts(100)).unwrap();
        assert!(r.exists() && r.is_pending() && !r.is_done());
        assert!(!r.is_ready(ts(99)));
        assert!(r.is_ready(ts(100)));
        assert!(r.is_ready(ts(101)));
        assert_eq!(r.timestamp(), Some(ts(100)));
        assert_eq!(ReadyAt::DONE.timestamp(), None);
    }

    #[test]
    fn dispute_codes_are_stable() {
        assert_eq!(DisputeStatus::NotDisputed.code(), 0);
        assert_eq!(DisputeStatus::Disputed.code(), 1);
        assert_eq!(DisputeStatus::Rejected.code(), 2);
        assert!(DisputeStatus::Disputed.blocks_execution());
        assert!(!DisputeStatus::Rejected.blocks_execution());
    }

    #[test]
    fn dispute_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&DisputeStatus::NotDisputed).unwrap(),
            "\"NOT_DISPUTED\""
        );
    }

    #[test]
    fn status_view() {
        let entry = OperationEntry::scheduled(ReadyAt::at(ts(50)).unwrap());
        assert!(matches!(entry.status(ts(49)), OperationStatus::Waiting { .. }));
        assert!(matches!(entry.status(ts(50)), OperationStatus::Ready { .. }));
        assert_eq!(OperationEntry::default().status(ts(0)), OperationStatus::Unset);
        let done = OperationEntry {
            ready_at: ReadyAt::DONE,
            dispute: DisputeStatus::Rejected,
        };
        assert_eq!(done.status(ts(0)), OperationStatus::Done);
    }

    #[test]
    fn display() {
        assert_eq!(ReadyAt::UNSET.to_string(), "unset");
        assert_eq!(ReadyAt::DONE.to_string(), "done");
        assert_eq!(ReadyAt::at(ts(86_400)).unwrap().to_string(), "1970-01-02T00:00:00Z");
    }
}
