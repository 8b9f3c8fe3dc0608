//! # Notifications
//!
//! Every committed state change emits [`TimelockEvent`]s to the configured
//! [`EventSink`]s. Events are produced inside a transaction and delivered
//! only after the outermost transaction commits; a rolled-back change emits
//! nothing.
//!
//! Events are an audit trail. The registry never reads them back.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use timelock_core::{sha256_digest, Call, CanonicalBytes, ContentDigest, OperationId, Principal};
use timelock_state::ReadyAt;

// ── TimelockEvent ───────────────────────────────────────────────────────────

/// A state change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelockEvent {
    /// One sub-call of a newly scheduled operation.
    Scheduled {
        id: OperationId,
        index: usize,
        call: Call,
        predecessor: Option<OperationId>,
        ready_at: ReadyAt,
        proposer: Principal,
        description: String,
    },
    /// One sub-call of an executed operation.
    Executed {
        id: OperationId,
        index: usize,
        call: Call,
        executor: Principal,
    },
    /// A pending operation was removed, by cancellation or an accepted veto.
    Cancelled {
        id: OperationId,
        canceller: Principal,
        reasoning: String,
    },
    /// A veto was rejected by the arbiter.
    Rejected {
        id: OperationId,
        arbiter: Principal,
        reasoning: String,
    },
    /// A veto was filed.
    Disputed { id: OperationId, vetoer: Principal },
    /// The minimum delay changed.
    MinDelayChanged { old: u64, new: u64 },
}

impl TimelockEvent {
    /// The operation this event concerns, if any.
    pub fn operation_id(&self) -> Option<OperationId> {
        match self {
            Self::Scheduled { id, .. }
            | Self::Executed { id, .. }
            | Self::Cancelled { id, .. }
            | Self::Rejected { id, .. }
            | Self::Disputed { id, .. } => Some(*id),
            Self::MinDelayChanged { .. } => None,
        }
    }

    /// Return the string name of this event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scheduled { .. } => "scheduled",
            Self::Executed { .. } => "executed",
            Self::Cancelled { .. } => "cancelled",
            Self::Rejected { .. } => "rejected",
            Self::Disputed { .. } => "disputed",
            Self::MinDelayChanged { .. } => "min_delay_changed",
        }
    }

    /// Content digest of this event via `CanonicalBytes` → `sha256_digest`.
    pub fn digest(&self) -> Option<ContentDigest> {
        match CanonicalBytes::new(self) {
            Ok(canonical) => Some(sha256_digest(&canonical)),
            Err(e) => {
                tracing::warn!(kind = self.kind(), error = %e, "event canonicalization failed, digest unavailable");
                None
            }
        }
    }
}

impl std::fmt::Display for TimelockEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operation_id() {
            Some(id) => write!(f, "{} {id}", self.kind()),
            None => f.write_str(self.kind()),
        }
    }
}

// ── EventSink ───────────────────────────────────────────────────────────────

/// Receiver of committed events.
///
/// Sinks are called while the gate is locked; `publish` must not block on
/// another thread that uses the gate.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &TimelockEvent);
}

/// Forwards events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &TimelockEvent) {
        tracing::info!(
            target: "timelock::events",
            kind = event.kind(),
            id = ?event.operation_id(),
            "{event}"
        );
    }
}

// ── AuditTrail ──────────────────────────────────────────────────────────────

/// A committed event with its position and digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Monotonic sequence number, starting at 0. Survives trimming.
    pub sequence: u64,
    /// Wall-clock time the sink received the event.
    pub recorded_at: DateTime<Utc>,
    pub event: TimelockEvent,
    /// `None` if canonicalization failed.
    pub digest: Option<ContentDigest>,
}

/// Default capacity of an [`AuditTrail`].
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// An append-only, capped event log.
///
/// When the trail exceeds its capacity the oldest 10% of records are trimmed.
#[derive(Debug)]
pub struct AuditTrail {
    inner: Mutex<TrailInner>,
    max_entries: usize,
}

#[derive(Debug, Default)]
struct TrailInner {
    records: Vec<AuditRecord>,
    next_sequence: u64,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl AuditTrail {
    /// A trail holding at most `max_entries` records.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(TrailInner::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Append an event.
    pub fn append(&self, event: TimelockEvent) {
        let digest = event.digest();
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.records.push(AuditRecord {
            sequence,
            recorded_at: Utc::now(),
            event,
            digest,
        });
        if inner.records.len() > self.max_entries {
            let trim_count = (self.max_entries / 10).max(1);
            inner.records.drain(..trim_count);
        }
    }

    /// All retained records, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.inner.lock().records.clone()
    }

    /// All retained events, oldest first.
    pub fn events(&self) -> Vec<TimelockEvent> {
        self.inner
            .lock()
            .records
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    /// Retained events concerning `id`.
    pub fn events_for(&self, id: &OperationId) -> Vec<TimelockEvent> {
        self.inner
            .lock()
            .records
            .iter()
            .filter(|r| r.event.operation_id().as_ref() == Some(id))
            .map(|r| r.event.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }
}

impl EventSink for AuditTrail {
    fn publish(&self, event: &TimelockEvent) {
        self.append(event.clone());
    }
}
