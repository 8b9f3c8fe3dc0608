//! # Error Types
//!
//! Leaf errors shared by every crate in the workspace. Higher layers wrap
//! these with `#[from]` rather than stringifying them.

use thiserror::Error;

/// Errors raised while building identifiers and operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonical serialization of an operation preimage failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A principal string was empty or contained whitespace.
    #[error("invalid principal {0:?}: must be non-empty and contain no whitespace")]
    InvalidPrincipal(String),

    /// A hex-encoded field could not be decoded.
    #[error("invalid {what}: {reason}")]
    InvalidHex {
        /// Which field was being decoded (e.g. "operation id", "salt").
        what: &'static str,
        /// Why decoding failed.
        reason: String,
    },

    /// The parallel arrays describing a batch have different lengths.
    #[error("batch length mismatch: {targets} targets, {values} values, {payloads} payloads")]
    LengthMismatch {
        /// Number of targets supplied.
        targets: usize,
        /// Number of values supplied.
        values: usize,
        /// Number of payloads supplied.
        payloads: usize,
    },
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
