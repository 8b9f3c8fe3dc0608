//! # timelock-core — Foundational Types for the Timelock Gate
//!
//! Every other crate in the workspace depends on `timelock-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `Principal`, `OperationId` and
//!    `Salt` are validated newtypes. No bare strings or byte arrays cross
//!    crate boundaries.
//!
//! 2. **`CanonicalBytes` newtype.** Operation identity is computed only from
//!    `CanonicalBytes::new()`, so two observers holding the same public call
//!    data always derive the same id.
//!
//! 3. **Content-addressed operations.** An [`Operation`] id is the SHA-256 of
//!    its canonical preimage (targets, values, payloads, predecessor, salt).
//!    There are no counters or sequence numbers.
//!
//! 4. **Injectable time.** [`Clock`] abstracts "now" so the readiness rules
//!    can be tested at exact second boundaries.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `timelock-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod operation;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{bytes_to_hex, hex_to_bytes, OperationId, Principal, Salt};
pub use operation::{hash_operation, hash_operation_batch, Call, Operation};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp, SECONDS_PER_DAY};
