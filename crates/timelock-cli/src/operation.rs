//! # Operation Arguments
//!
//! `--target`, `--value` and `--payload` are repeatable and form parallel
//! arrays. One target makes a single-call operation; several make a batch.
//! Omitted values default to zero and omitted payloads to empty.

use clap::Args;

use timelock_controller::TimelockError;
use timelock_core::{hex_to_bytes, Operation, OperationId, Principal, Salt};

/// Hex-encoded bytes, `0x` prefix optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl std::str::FromStr for HexBytes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex_to_bytes(s).map(HexBytes)
    }
}

/// The call data identifying an operation.
#[derive(Args, Debug, Clone)]
pub struct OperationArgs {
    /// Call target. Repeat for a batch.
    #[arg(long = "target", required = true)]
    pub targets: Vec<Principal>,

    /// Value sent with each call, in target order.
    #[arg(long = "value")]
    pub values: Vec<u128>,

    /// Hex payload of each call, in target order.
    #[arg(long = "payload")]
    pub payloads: Vec<HexBytes>,

    /// Operation that must be executed first.
    #[arg(long)]
    pub predecessor: Option<OperationId>,

    /// 32-byte hex salt. Defaults to zero.
    #[arg(long)]
    pub salt: Option<Salt>,
}

impl OperationArgs {
    /// Assemble the operation, filling omitted values and payloads.
    pub fn to_operation(&self) -> Result<Operation, TimelockError> {
        let n = self.targets.len();
        let values = if self.values.is_empty() {
            vec![0; n]
        } else {
            self.values.clone()
        };
        let payloads = if self.payloads.is_empty() {
            vec![Vec::new(); n]
        } else {
            self.payloads.iter().map(|p| p.0.clone()).collect()
        };
        Ok(Operation::batch(
            self.targets.clone(),
            values,
            payloads,
            self.predecessor,
            self.salt.unwrap_or(Salt::ZERO),
        )?)
    }
}
