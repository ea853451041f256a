//! # Encoders
//!
//! An encoder tells the tree how to turn a caller's key into a nibble path
//! and a caller's value into the 256-bit hash stored in a leaf. Encoders are
//! type-level only and never instantiated.

use crate::hash::{sha3_256, Hash256};
use crate::path::TreeNodePath;
use std::marker::PhantomData;

/// Key and value encoding for a tree
pub trait TreeEncoder {
    type Key;
    type Value;

    /// Key representation; every key of one tree must encode to the same width
    type EncodedKey: Into<TreeNodePath>;

    fn encode_key(key: &Self::Key) -> Self::EncodedKey;

    fn encode_value(value: &Self::Value) -> Hash256;
}

/// Uses keys as they are and values that already are hashes
pub struct PassThroughEncoder<K>(PhantomData<fn() -> K>);

impl<K> TreeEncoder for PassThroughEncoder<K>
where
    K: Clone + Into<TreeNodePath>,
{
    type Key = K;
    type Value = Hash256;
    type EncodedKey = K;

    fn encode_key(key: &K) -> K {
        key.clone()
    }

    fn encode_value(value: &Hash256) -> Hash256 {
        *value
    }
}

/// Uses keys as they are and stores the SHA3-256 of each value's bytes
pub struct Sha3ValueEncoder<K, V>(PhantomData<fn() -> (K, V)>);

impl<K, V> TreeEncoder for Sha3ValueEncoder<K, V>
where
    K: Clone + Into<TreeNodePath>,
    V: AsRef<[u8]>,
{
    type Key = K;
    type Value = V;
    type EncodedKey = K;

    fn encode_key(key: &K) -> K {
        key.clone()
    }

    fn encode_value(value: &V) -> Hash256 {
        sha3_256(value.as_ref())
    }
}
