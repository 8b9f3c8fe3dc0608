//! # Operation Registry
//!
//! An id-keyed map of [`OperationEntry`] records. Absent keys read as the
//! unset entry, so every predicate is total over all ids.
//!
//! The registry is a plain value: it is `Clone` so the controller can
//! snapshot it before a transaction and restore it on failure, and it is
//! serde-serializable for persistence. It performs no authorization and no
//! minimum-delay policy; those belong to the controller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use timelock_core::{OperationId, Timestamp};

use crate::entry::{DisputeStatus, OperationEntry, ReadyAt};

/// Registry transition failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An entry with this id already exists (pending or done).
    #[error("operation {id} already scheduled (ready_at: {ready_at})")]
    AlreadyScheduled {
        /// The operation id.
        id: OperationId,
        /// Its current readiness.
        ready_at: ReadyAt,
    },

    /// `now + delay` does not fit the timestamp width.
    #[error("ready time overflows: now {now} + delay {delay}s")]
    TimestampOverflow {
        /// Scheduling time (seconds).
        now: u64,
        /// Requested delay (seconds).
        delay: u64,
    },

    /// `now + delay` would collide with the unset/done sentinels.
    #[error("ready time {ready_at}s collides with a reserved sentinel value")]
    InvalidTimestamp {
        /// The computed ready time (seconds).
        ready_at: u64,
    },

    /// The operation is not pending.
    #[error("operation {id} is not pending (ready_at: {ready_at})")]
    NotPending {
        /// The operation id.
        id: OperationId,
        /// Its current readiness.
        ready_at: ReadyAt,
    },

    /// The operation is not ready at the given time.
    #[error("operation {id} is not ready (ready_at: {ready_at})")]
    NotReady {
        /// The operation id.
        id: OperationId,
        /// Its current readiness.
        ready_at: ReadyAt,
    },
}

/// The id → entry map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationRegistry {
    entries: BTreeMap<OperationId, OperationEntry>,
}

impl OperationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// The entry for `id`, or the unset entry.
    pub fn entry(&self, id: &OperationId) -> OperationEntry {
        self.entries.get(id).copied().unwrap_or_default()
    }

    /// Readiness of `id`.
    pub fn ready_at(&self, id: &OperationId) -> ReadyAt {
        self.entry(id).ready_at
    }

    /// Dispute status of `id`.
    pub fn dispute_status(&self, id: &OperationId) -> DisputeStatus {
        self.entry(id).dispute
    }

    /// Whether any entry exists for `id`.
    pub fn exists(&self, id: &OperationId) -> bool {
        self.ready_at(id).exists()
    }

    /// Whether `id` is scheduled and not yet done.
    pub fn is_pending(&self, id: &OperationId) -> bool {
        self.ready_at(id).is_pending()
    }

    /// Whether `id` is pending and its waiting period has elapsed.
    pub fn is_ready(&self, id: &OperationId, now: Timestamp) -> bool {
        self.ready_at(id).is_ready(now)
    }

    /// Whether `id` has been executed.
    pub fn is_done(&self, id: &OperationId) -> bool {
        self.ready_at(id).is_done()
    }

    /// Number of stored entries (pending and done).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&OperationId, &OperationEntry)> {
        self.entries.iter()
    }

    /// Ids of all pending operations.
    pub fn pending_ids(&self) -> Vec<OperationId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.ready_at.is_pending())
            .map(|(id, _)| *id)
            .collect()
    }

    // ── Transitions ────────────────────────────────────────────────────

    /// Record a new operation that becomes ready at `now + delay`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::AlreadyScheduled`] if the id exists (pending or done).
    /// - [`RegistryError::TimestampOverflow`] if `now + delay` overflows.
    /// - [`RegistryError::InvalidTimestamp`] if `now + delay <= 1`.
    pub fn insert_scheduled(
        &mut self,
        id: OperationId,
        now: Timestamp,
        delay: u64,
    ) -> Result<ReadyAt, RegistryError> {
        let current = self.ready_at(&id);
        if current.exists() {
            return Err(RegistryError::AlreadyScheduled {
                id,
                ready_at: current,
            });
        }
        let at = now
            .checked_add(delay)
            .ok_or(RegistryError::TimestampOverflow {
                now: now.secs(),
                delay,
            })?;
        let ready_at =
            ReadyAt::at(at).ok_or(RegistryError::InvalidTimestamp { ready_at: at.secs() })?;
        self.entries.insert(id, OperationEntry::scheduled(ready_at));
        Ok(ready_at)
    }

    /// Delete a pending entry, returning it. The id becomes schedulable again.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotPending`] if the id is unset or done.
    pub fn remove_pending(&mut self, id: &OperationId) -> Result<OperationEntry, RegistryError> {
        let ready_at = self.ready_at(id);
        if !ready_at.is_pending() {
            return Err(RegistryError::NotPending { id: *id, ready_at });
        }
        self.entries
            .remove(id)
            .ok_or(RegistryError::NotPending { id: *id, ready_at })
    }

    /// Mark a ready entry done. The dispute status is retained but inert.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotReady`] unless the id is ready at `now`.
    pub fn mark_done(&mut self, id: &OperationId, now: Timestamp) -> Result<(), RegistryError> {
        match self.entries.get_mut(id) {
            Some(entry) if entry.ready_at.is_ready(now) => {
                entry.ready_at = ReadyAt::DONE;
                Ok(())
            }
            _ => Err(RegistryError::NotReady {
                id: *id,
                ready_at: self.ready_at(id),
            }),
        }
    }

    /// Mutable access to a stored entry, for dispute transitions.
    pub fn entry_mut(&mut self, id: &OperationId) -> Option<&mut OperationEntry> {
        self.entries.get_mut(id)
    }
}
