//! # timelock-state — Operation Registry
//!
//! The registry is the authoritative source of truth for every operation the
//! gate knows about. Each entry is keyed by a content-derived
//! [`OperationId`](timelock_core::OperationId) and holds two facts:
//!
//! - **`ready_at`** ([`ReadyAt`]): `0` means no such operation, `1` means
//!   done, anything larger is the UNIX second at which it becomes executable.
//! - **`dispute`** ([`DisputeStatus`]): `NOT_DISPUTED → DISPUTED →
//!   REJECTED`, inert once the operation is done.
//!
//! ## Lifecycle
//!
//! ```text
//!            schedule               mark_done
//!   unset ───────────────▶ pending ───────────▶ done
//!     ▲                      │
//!     └──── remove_pending ──┘   (cancel or accepted veto)
//! ```
//!
//! Entries are created only by [`OperationRegistry::insert_scheduled`] and
//! removed only by [`OperationRegistry::remove_pending`]. Dispute transitions
//! live in `timelock-arbitration` and reach entries through
//! [`OperationRegistry::entry_mut`].

pub mod entry;
pub mod registry;

pub use entry::{DisputeStatus, OperationEntry, OperationStatus, ReadyAt};
pub use registry::{OperationRegistry, RegistryError};
