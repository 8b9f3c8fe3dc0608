//! # Arbitration Error Types
//!
//! Every variant carries the operation id and, where relevant, the dispute
//! status observed when the transition was rejected.

use thiserror::Error;

use timelock_core::OperationId;
use timelock_state::{DisputeStatus, ReadyAt};

/// Errors arising from dispute filing and resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationError {
    /// Only pending operations can be disputed.
    #[error("operation {id} is not pending (ready_at: {ready_at})")]
    NotPending {
        /// The operation id.
        id: OperationId,
        /// Its readiness at the time of the attempt.
        ready_at: ReadyAt,
    },

    /// The operation is already disputed, or its veto was already rejected.
    #[error("operation {id} is either already disputed or can not be disputed ({status})")]
    AlreadyDisputedOrTerminal {
        /// The operation id.
        id: OperationId,
        /// Its current dispute status.
        status: DisputeStatus,
    },

    /// A ruling was issued for an operation with no open dispute.
    #[error("operation {id} has no open dispute ({status})")]
    NotDisputed {
        /// The operation id.
        id: OperationId,
        /// Its current dispute status.
        status: DisputeStatus,
    },
}
