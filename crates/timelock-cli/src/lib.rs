//! # timelock-cli — Command-Line Front End for the Timelock Gate
//!
//! ## Subcommands
//!
//! - `timelock init --config gate.yaml` — Create a state snapshot.
//! - `timelock hash` — Print the id of an operation.
//! - `timelock schedule` / `cancel` — Propose or withdraw an operation.
//! - `timelock dispute` / `resolve` — Veto and arbitration.
//! - `timelock execute` — Run a ready operation.
//! - `timelock status` — Inspect one operation or the whole gate.
//! - `timelock self-call update-delay` — Encode a self-call payload.
//!
//! ```bash
//! timelock init --config gate.yaml
//! timelock schedule --as council --target treasury --payload 0x13e414de
//! timelock --now 1700172800 execute --as keeper --target treasury --payload 0x13e414de
//! ```
//!
//! The snapshot holds the configuration, the role grants and the ledger.
//! A failed command leaves it untouched.

pub mod commands;
pub mod operation;
pub mod state;

use std::path::PathBuf;

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    /// Path to the state snapshot.
    pub state: PathBuf,
    /// Pinned clock, in UNIX seconds. `None` uses the system clock.
    pub now: Option<u64>,
}
