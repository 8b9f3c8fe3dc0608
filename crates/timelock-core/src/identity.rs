//! # Identifier Newtypes
//!
//! `Principal` names an actor or call target, `OperationId` names a scheduled
//! operation, and `Salt` disambiguates otherwise identical operations. They
//! are distinct types so an operation id can never be passed where a salt is
//! expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

const WILDCARD: &str = "*";

/// An actor or call target, e.g. `"0xA11CE"` or `"treasury"`.
///
/// The reserved value `*` ([`Principal::anyone`]) stands for every caller:
/// granting a role to it opens that role to the public.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Validate and wrap a principal name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPrincipal`] for an empty string or one
    /// containing whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidPrincipal(name));
        }
        Ok(Self(name))
    }

    /// The wildcard principal.
    pub fn anyone() -> Self {
        Self(WILDCARD.to_string())
    }

    /// Whether this is the wildcard principal.
    pub fn is_anyone(&self) -> bool {
        self.0 == WILDCARD
    }

    /// Access the principal name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Principal {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.0
    }
}

impl std::str::FromStr for Principal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! hex32_newtype {
    ($name:ident, $what:literal) => {
        impl $name {
            /// Wrap raw bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Access the raw bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase hex without prefix.
            pub fn to_hex(&self) -> String {
                bytes_to_hex(&self.0)
            }

            /// Parse 64 hex characters, with or without a `0x` prefix.
            pub fn from_hex(s: &str) -> Result<Self, CoreError> {
                let raw = hex_to_bytes(s).map_err(|reason| CoreError::InvalidHex {
                    what: $what,
                    reason,
                })?;
                let bytes: [u8; 32] = raw.try_into().map_err(|v: Vec<u8>| CoreError::InvalidHex {
                    what: $what,
                    reason: format!("expected 32 bytes, got {}", v.len()),
                })?;
                Ok(Self(bytes))
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "0x{}", self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Content-derived identifier of an operation (single call or batch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId([u8; 32]);

hex32_newtype!(OperationId, "operation id");

impl OperationId {
    /// The all-zero id. As a predecessor it means "no dependency".
    pub const ZERO: OperationId = OperationId([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Caller-chosen salt. Scheduling the same calls under different salts yields
/// distinct operations that can be pending in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Salt([u8; 32]);

hex32_newtype!(Salt, "salt");

impl Salt {
    /// The all-zero salt.
    pub const ZERO: Salt = Salt([0u8; 32]);
}

/// Lowercase hex rendering of a byte slice.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a hex string, accepting an optional `0x` prefix.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, String> {
    let hex = hex.trim();
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if hex.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .ok_or_else(|| format!("non-ascii character near position {i}"))
                .and_then(|pair| {
                    u8::from_str_radix(pair, 16)
                        .map_err(|e| format!("invalid hex at position {i}: {e}"))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_rejects_blank_and_whitespace() {
        assert!(Principal::new("").is_err());
        assert!(Principal::new("two words").is_err());
        assert!(Principal::new("0xA11CE").is_ok());
    }

    #[test]
    fn wildcard_is_recognised() {
        assert!(Principal::anyone().is_anyone());
        assert!(Principal::new("*").unwrap().is_anyone());
        assert!(!Principal::new("alice").unwrap().is_anyone());
    }

    #[test]
    fn principal_serde_validates() {
        let p: Principal = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(p.as_str(), "bob");
        assert!(serde_json::from_str::<Principal>("\"\"").is_err());
    }

    #[test]
    fn operation_id_hex_roundtrip_with_prefix() {
        let id = OperationId::from_bytes([0xab; 32]);
        let shown = id.to_string();
        assert!(shown.starts_with("0xabab"));
        assert_eq!(OperationId::from_hex(&shown).unwrap(), id);
        assert_eq!(OperationId::from_hex(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn operation_id_rejects_wrong_length() {
        let err = OperationId::from_hex("abcd").unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn salt_serializes_as_prefixed_hex() {
        let json = serde_json::to_string(&Salt::ZERO).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "0".repeat(64)));
    }

    #[test]
    fn hex_decoding() {
        assert_eq!(hex_to_bytes("0x13e414de").unwrap(), vec![0x13, 0xe4, 0x14, 0xde]);
        assert_eq!(hex_to_bytes("").unwrap(), Vec::<u8>::new());
        assert!(hex_to_bytes("abc").is_err());
        assert!(hex_to_bytes("zz").is_err());
    }
}
