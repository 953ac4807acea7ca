use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A 256-bit content digest.
///
/// Used both as a block's identity (`content_hash`) and as the link target
/// stored in the next block (`previous_hash`). Serialized as a 64-character
/// lowercase hex string so the on-disk snapshot stays human-editable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Wrap a pre-computed 32-byte hash.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The all-zero digest.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Returns `true` if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 16 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Digest> for [u8; 32] {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_all_zeros() {
        let zero = Digest::zero();
        assert!(zero.is_zero());
        assert_eq!(zero.as_bytes(), &[0u8; 32]);
        assert_eq!(zero.to_hex(), "0".repeat(64));
    }

    #[test]
    fn hex_roundtrip() {
        let digest = Digest::from_hash([0xab; 32]);
        let parsed = Digest::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = Digest::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let err = Digest::from_hex(&"zz".repeat(32)).unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn short_hex_is_16_chars() {
        assert_eq!(Digest::from_hash([7; 32]).short_hex().len(), 16);
    }

    #[test]
    fn serializes_as_hex_string() {
        let digest = Digest::from_hash([1; 32]);
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let parsed: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn deserialize_rejects_bad_hex() {
        let result: Result<Digest, _> = serde_json::from_str("\"not-a-digest\"");
        assert!(result.is_err());
    }

    #[test]
    fn ordering_is_consistent() {
        assert!(Digest::from_hash([0; 32]) < Digest::from_hash([1; 32]));
    }
}
