//! # Hash256
//!
//! The 256-bit digest used as node identity, link target and value.
//! Every node hash in the tree is SHA3-256.

use patricia_error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

/// A 32-byte hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// Byte width of a hash
    pub const SIZE: usize = 32;

    /// The zero hash, root of the empty tree and filler for absent links
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }

    /// Create from a slice, `None` unless it is exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Hash256(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Uppercase hex, no prefix
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| {
            Error::parse_failed(format!("invalid hash hex: {}", e))
                .with_operation("hash256::from_str")
                .set_source(e)
        })?;

        Hash256::from_slice(&bytes).ok_or_else(|| {
            Error::parse_failed(format!("hash must be {} bytes, got {}", Self::SIZE, bytes.len()))
                .with_operation("hash256::from_str")
        })
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// SHA3-256 of a single buffer
pub fn sha3_256(data: &[u8]) -> Hash256 {
    Hash256(Sha3_256::digest(data).into())
}

/// Incremental SHA3-256 over several buffers
#[derive(Default)]
pub struct HashBuilder {
    hasher: Sha3_256,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.hasher.update(data.as_ref());
        self
    }

    pub fn finalize(self) -> Hash256 {
        Hash256(self.hasher.finalize().into())
    }
}
