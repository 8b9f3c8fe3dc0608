//! # Gate Error Types
//!
//! [`TimelockError`] is the single error surface of the gate. Lower-layer
//! errors (`CoreError`, `RegistryError`, `ArbitrationError`) are mapped into
//! it variant by variant so callers match on one taxonomy.
//!
//! Every error rejects the entire requested state change. Nothing is retried
//! internally.

use thiserror::Error;

use timelock_arbitration::ArbitrationError;
use timelock_core::{CoreError, OperationId, Principal};
use timelock_state::{DisputeStatus, ReadyAt, RegistryError};

use crate::access::Role;

/// Errors returned by every gate entry point.
#[derive(Error, Debug)]
pub enum TimelockError {
    /// The caller lacks the role the entry point requires.
    #[error("{principal} is missing role {role}")]
    Unauthorized {
        /// The role checked.
        role: Role,
        /// The caller.
        principal: Principal,
    },

    /// An operation with this id already exists (pending or done).
    #[error("operation {id} already scheduled")]
    AlreadyScheduled {
        /// The operation id.
        id: OperationId,
    },

    /// The requested delay is below the current minimum.
    #[error("insufficient delay: {delay}s < minimum {min_delay}s")]
    InsufficientDelay {
        /// Requested delay in seconds.
        delay: u64,
        /// Current minimum delay in seconds.
        min_delay: u64,
    },

    /// A minimum delay outside the configured bounds.
    #[error("delay {delay}s outside bounds [{minimum}s, {maximum}s]")]
    DelayOutOfBounds {
        /// The rejected delay in seconds.
        delay: u64,
        /// Lower bound.
        minimum: u64,
        /// Upper bound.
        maximum: u64,
    },

    /// `now + delay` overflows the timestamp width.
    #[error("ready time overflows: now {now} + delay {delay}s")]
    TimestampOverflow {
        /// Scheduling time in seconds.
        now: u64,
        /// Requested delay in seconds.
        delay: u64,
    },

    /// `now + delay` collides with a reserved sentinel.
    #[error("ready time {ready_at}s collides with a reserved sentinel value")]
    InvalidTimestamp {
        /// Computed ready time in seconds.
        ready_at: u64,
    },

    /// Batch arrays differ in length.
    #[error("batch length mismatch: {targets} targets, {values} values, {payloads} payloads")]
    LengthMismatch {
        /// Number of targets.
        targets: usize,
        /// Number of values.
        values: usize,
        /// Number of payloads.
        payloads: usize,
    },

    /// The operation is not pending.
    #[error("operation {id} is not pending")]
    NotPending {
        /// The operation id.
        id: OperationId,
    },

    /// The operation is not ready for execution.
    #[error("operation {id} is not ready (ready_at: {ready_at})")]
    NotReady {
        /// The operation id.
        id: OperationId,
        /// Its readiness when checked.
        ready_at: ReadyAt,
    },

    /// The operation is disputed and cannot execute.
    #[error("operation {id} is disputed so it can not be executed")]
    Disputed {
        /// The operation id.
        id: OperationId,
    },

    /// The predecessor has not been executed.
    #[error("operation {id} depends on {predecessor}, which is not done")]
    MissingDependency {
        /// The operation id.
        id: OperationId,
        /// The unmet predecessor.
        predecessor: OperationId,
    },

    /// A ruling was issued without an open dispute.
    #[error("operation {id} has no open dispute ({status})")]
    NotDisputed {
        /// The operation id.
        id: OperationId,
        /// Its dispute status.
        status: DisputeStatus,
    },

    /// The operation is already disputed or its veto was rejected.
    #[error("operation {id} is either already disputed or can not be disputed ({status})")]
    AlreadyDisputedOrTerminal {
        /// The operation id.
        id: OperationId,
        /// Its dispute status.
        status: DisputeStatus,
    },

    /// A sub-call failed; the whole operation was rolled back.
    #[error("call {index} of operation {id} to {target} failed: {reason}")]
    InvocationFailed {
        /// The operation id.
        id: OperationId,
        /// Index of the failing sub-call.
        index: usize,
        /// Its target.
        target: Principal,
        /// Failure reported by the invoker.
        reason: String,
    },

    /// A configuration entry point was called by someone other than the gate.
    #[error("caller {caller} is not the timelock itself")]
    NotSelf {
        /// The caller.
        caller: Principal,
    },

    /// A call addressed to the gate carried an undecodable payload or a value.
    #[error("invalid self-call: {0}")]
    InvalidSelfCall(String),

    /// Identity derivation failed.
    #[error("operation identity error: {0}")]
    Identity(CoreError),

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TimelockError {
    /// True for authorization failures, including configuration updates that
    /// were not routed through self-execution.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::NotSelf { .. })
    }
}

impl From<CoreError> for TimelockError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LengthMismatch {
                targets,
                values,
                payloads,
            } => Self::LengthMismatch {
                targets,
                values,
                payloads,
            },
            other => Self::Identity(other),
        }
    }
}

impl From<RegistryError> for TimelockError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyScheduled { id, .. } => Self::AlreadyScheduled { id },
            RegistryError::TimestampOverflow { now, delay } => {
                Self::TimestampOverflow { now, delay }
            }
            RegistryError::InvalidTimestamp { ready_at } => Self::InvalidTimestamp { ready_at },
            RegistryError::NotPending { id, .. } => Self::NotPending { id },
            RegistryError::NotReady { id, ready_at } => Self::NotReady { id, ready_at },
        }
    }
}

impl From<ArbitrationError> for TimelockError {
    fn from(err: ArbitrationError) -> Self {
        match err {
            ArbitrationError::NotPending { id, .. } => Self::NotPending { id },
            ArbitrationError::AlreadyDisputedOrTerminal { id, status } => {
                Self::AlreadyDisputedOrTerminal { id, status }
            }
            ArbitrationError::NotDisputed { id, status } => Self::NotDisputed { id, status },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> OperationId {
        OperationId::from_bytes([3; 32])
    }

    #[test]
    fn not_self_counts_as_unauthorized() {
        let err = TimelockError::NotSelf {
            caller: Principal::new("mallory").unwrap(),
        };
        assert!(err.is_unauthorized());
        assert!(!TimelockError::Disputed { id: id() }.is_unauthorized());
    }

    #[test]
    fn length_mismatch_maps_to_its_own_variant() {
        let err: TimelockError = CoreError::LengthMismatch {
            targets: 1,
            values: 2,
            payloads: 1,
        }
        .into();
        assert!(matches!(err, TimelockError::LengthMismatch { values: 2, .. }));

        let err: TimelockError = CoreError::InvalidPrincipal(String::new()).into();
        assert!(matches!(err, TimelockError::Identity(_)));
    }

    #[test]
    fn registry_errors_map() {
        let err: TimelockError = RegistryError::NotReady {
            id: id(),
            ready_at: ReadyAt::DONE,
        }
        .into();
        assert!(matches!(err, TimelockError::NotReady { ready_at: ReadyAt::DONE, .. }));
    }

    #[test]
    fn arbitration_errors_map() {
        let err: TimelockError = ArbitrationError::AlreadyDisputedOrTerminal {
            id: id(),
            status: DisputeStatus::Rejected,
        }
        .into();
        assert!(matches!(
            err,
            TimelockError::AlreadyDisputedOrTerminal {
                status: DisputeStatus::Rejected,
                ..
            }
        ));
    }

    #[test]
    fn disputed_message_is_descriptive() {
        let msg = TimelockError::Disputed { id: id() }.to_string();
        assert!(msg.contains("disputed so it can not be executed"));
    }
}
