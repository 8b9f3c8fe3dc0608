//! # timelock-arbitration — Veto and Arbitration
//!
//! Layers a binary veto on top of the operation registry:
//!
//! - **Dispute** ([`dispute`]): a veto holder files a dispute against a
//!   pending operation, blocking its execution; the arbiter then rules.
//!   Accepting the veto deletes the operation; rejecting it clears the
//!   operation permanently.
//!
//! - **Errors** ([`error`]): structured rejections carrying the operation id
//!   and the dispute status at the time of failure.
//!
//! ## Crate Policy
//!
//! - Depends on `timelock-core` and `timelock-state` internally.
//! - Performs no authorization. Role checks happen in the controller before
//!   any function here is called.

pub mod dispute;
pub mod error;

pub use dispute::{open_dispute, resolve_dispute, DisputeTransition, Ruling, Verdict};
pub use error::ArbitrationError;
