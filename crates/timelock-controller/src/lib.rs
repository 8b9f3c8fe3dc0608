//! # timelock-controller — The Timelock Gate
//!
//! Proposals are scheduled with a mandatory waiting period, may be vetoed and
//! sent to an arbiter while waiting, and are executed atomically once ready.
//!
//! ## Architecture
//!
//! ```text
//!  proposer ──schedule──▶ ┌──────────────┐ ──invoke──▶ Invoker
//!  vetoer  ──dispute───▶ │   Timelock    │ ──publish─▶ EventSink(s)
//!  arbiter ──resolve───▶ │ (re-entrant   │
//!  executor ──execute──▶ │  transactions)│ ◀─has_role─ AccessControl
//!                         └──────────────┘
//! ```
//!
//! - [`timelock::Timelock`] holds the registry (from `timelock-state`) and the
//!   minimum delay, and runs every entry point as an all-or-nothing
//!   transaction.
//! - [`access::AccessControl`] answers role checks. [`access::RoleRegistry`]
//!   is the in-memory implementation.
//! - [`invoke::Invoker`] performs dispatched calls. Calls addressed to the
//!   gate itself are decoded as [`invoke::SelfCall`]s instead.
//! - [`event::EventSink`] receives committed [`event::TimelockEvent`]s.
//!   [`event::AuditTrail`] keeps a digested, capped log of them.

pub mod access;
pub mod config;
pub mod error;
pub mod event;
pub mod invoke;
pub mod timelock;

pub use access::{AccessControl, Role, RoleGrants, RoleRegistry};
pub use config::{DelayBounds, RoleAssignments, TimelockConfig, MAXIMUM_DELAY, MINIMUM_DELAY};
pub use error::TimelockError;
pub use event::{AuditRecord, AuditTrail, EventSink, TimelockEvent, TracingSink};
pub use invoke::{CallHook, InvocationError, Invoker, RecordingInvoker, SelfCall};
pub use timelock::{LedgerSnapshot, Timelock, TimelockBuilder};

pub use timelock_arbitration::{Ruling, Verdict};
pub use timelock_core::{Call, Operation, OperationId, Principal, Salt, Timestamp};
pub use timelock_state::{DisputeStatus, OperationStatus, ReadyAt};
