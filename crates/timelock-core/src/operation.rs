//! # Calls, Operations and Operation Identity
//!
//! An [`Operation`] is one logically atomic unit of privileged work: an
//! ordered list of [`Call`]s plus an optional predecessor and a salt. Its id
//! is
//!
//! ```text
//! sha256(JCS({ targets, values, payloads, predecessor, salt }))
//! ```
//!
//! computed over parallel arrays, so reordering the calls changes the id. A
//! single-call operation is the one-element batch and hashes identically to
//! it. Values are encoded as decimal strings because `u128` does not fit a
//! JSON integer; payloads, predecessor and salt are lowercase hex, with an
//! absent predecessor encoded as 32 zero bytes.

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalBytes;
use crate::digest::sha256_digest;
use crate::error::CoreError;
use crate::identity::{bytes_to_hex, OperationId, Principal, Salt};

/// One sub-call of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Call {
    /// Who receives the call.
    pub target: Principal,
    /// Value transferred alongside the call.
    #[serde(with = "decimal")]
    pub value: u128,
    /// Opaque call data.
    #[serde(with = "hex_payload")]
    pub payload: Vec<u8>,
}

impl Call {
    /// Build a call.
    pub fn new(target: Principal, value: u128, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            target,
            value,
            payload: payload.into(),
        }
    }
}

/// An ordered batch of calls sharing one id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Sub-calls, dispatched in index order.
    pub calls: Vec<Call>,
    /// Operation that must be done before this one may execute.
    pub predecessor: Option<OperationId>,
    /// Disambiguating salt.
    pub salt: Salt,
}

#[derive(Serialize)]
struct Preimage<'a> {
    targets: Vec<&'a str>,
    values: Vec<String>,
    payloads: Vec<String>,
    predecessor: String,
    salt: String,
}

impl Operation {
    /// A one-call operation. A zero predecessor is taken as none.
    pub fn single(call: Call, predecessor: Option<OperationId>, salt: Salt) -> Self {
        Self {
            calls: vec![call],
            predecessor: predecessor.filter(|p| !p.is_zero()),
            salt,
        }
    }

    /// Assemble a batch from parallel arrays. A zero predecessor is taken
    /// as none.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LengthMismatch`] if the arrays differ in length.
    pub fn batch(
        targets: Vec<Principal>,
        values: Vec<u128>,
        payloads: Vec<Vec<u8>>,
        predecessor: Option<OperationId>,
        salt: Salt,
    ) -> Result<Self, CoreError> {
        if targets.len() != values.len() || targets.len() != payloads.len() {
            return Err(CoreError::LengthMismatch {
                targets: targets.len(),
                values: values.len(),
                payloads: payloads.len(),
            });
        }
        let calls = targets
            .into_iter()
            .zip(values)
            .zip(payloads)
            .map(|((target, value), payload)| Call {
                target,
                value,
                payload,
            })
            .collect();
        Ok(Self {
            calls,
            predecessor: predecessor.filter(|p| !p.is_zero()),
            salt,
        })
    }

    /// The operation that must be done first, if any. Zero hashes like an
    /// absent predecessor and is treated as one.
    pub fn dependency(&self) -> Option<OperationId> {
        self.predecessor.filter(|p| !p.is_zero())
    }

    /// Number of sub-calls.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// True for an operation without sub-calls.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Compute the content-derived id of this operation.
    pub fn id(&self) -> Result<OperationId, CoreError> {
        let predecessor = self.dependency().unwrap_or(OperationId::ZERO);
        let preimage = Preimage {
            targets: self.calls.iter().map(|c| c.target.as_str()).collect(),
            values: self.calls.iter().map(|c| c.value.to_string()).collect(),
            payloads: self.calls.iter().map(|c| bytes_to_hex(&c.payload)).collect(),
            predecessor: predecessor.to_hex(),
            salt: self.salt.to_hex(),
        };
        let canonical = CanonicalBytes::new(&preimage)?;
        Ok(OperationId::from_bytes(sha256_digest(&canonical).bytes))
    }
}

/// Id of a single-call operation.
pub fn hash_operation(
    target: &Principal,
    value: u128,
    payload: &[u8],
    predecessor: Option<OperationId>,
    salt: Salt,
) -> Result<OperationId, CoreError> {
    Operation::single(Call::new(target.clone(), value, payload), predecessor, salt).id()
}

/// Id of a batch operation given as parallel arrays.
pub fn hash_operation_batch(
    targets: &[Principal],
    values: &[u128],
    payloads: &[Vec<u8>],
    predecessor: Option<OperationId>,
    salt: Salt,
) -> Result<OperationId, CoreError> {
    Operation::batch(
        targets.to_vec(),
        values.to_vec(),
        payloads.to_vec(),
        predecessor,
        salt,
    )?
    .id()
}

mod decimal {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Int(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(de::Error::custom),
            Repr::Int(n) => Ok(u128::from(n)),
        }
    }
}

mod hex_payload {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::identity::{bytes_to_hex, hex_to_bytes};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", bytes_to_hex(payload)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex_to_bytes(&s).map_err(serde::de::Error::custom)
    }
}
