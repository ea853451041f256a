//! # TreeNodePath
//!
//! Keys are walked as nibbles (half-bytes), so every node can branch
//! 16 ways. A path keeps its nibbles packed two per byte; `adjustment`
//! records whether the high nibble of the first byte is skipped, which lets
//! a sub-path start at an odd offset without repacking.

use crate::hash::Hash256;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Leaf flag in the first byte of an encoded path
const LEAF_FLAG: u8 = 0x20;

/// Odd-length flag in the first byte of an encoded path
const ODD_FLAG: u8 = 0x10;

/// An immutable sequence of nibbles
#[derive(Clone, Default)]
pub struct TreeNodePath {
    bytes: Vec<u8>,
    adjustment: usize,
    size: usize,
}

impl TreeNodePath {
    /// Create an empty path
    pub const fn new() -> Self {
        TreeNodePath {
            bytes: Vec::new(),
            adjustment: 0,
            size: 0,
        }
    }

    /// Create from bytes, most significant nibble first
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() * 2;
        TreeNodePath {
            bytes,
            adjustment: 0,
            size,
        }
    }

    /// Create from individual nibbles; only the low 4 bits of each are used
    pub fn from_nibbles(nibbles: impl IntoIterator<Item = u8>) -> Self {
        let mut bytes = Vec::new();
        let mut size = 0;
        for nibble in nibbles {
            let nibble = nibble & 0x0F;
            if size % 2 == 0 {
                bytes.push(nibble << 4);
            } else if let Some(last) = bytes.last_mut() {
                *last |= nibble;
            }
            size += 1;
        }

        TreeNodePath {
            bytes,
            adjustment: 0,
            size,
        }
    }

    /// Create from packed bytes holding `size` nibbles from index 0
    pub(crate) fn from_packed(bytes: Vec<u8>, size: usize) -> Self {
        debug_assert!(bytes.len() * 2 >= size);
        TreeNodePath {
            bytes,
            adjustment: 0,
            size,
        }
    }

    /// Number of nibbles
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get the nibble at `index`.
    ///
    /// # Panics
    /// Panics if `index >= len()`.
    pub fn nibble_at(&self, index: usize) -> u8 {
        assert!(index < self.size, "nibble index {} out of range for path of {}", index, self.size);
        let index = index + self.adjustment;
        let byte = self.bytes[index / 2];
        if index % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    /// Iterate over all nibbles in order
    pub fn nibbles(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.size).map(move |i| self.nibble_at(i))
    }

    /// Path from `offset` to the end
    pub fn subpath(&self, offset: usize) -> Self {
        assert!(offset <= self.size, "subpath offset {} beyond path of {}", offset, self.size);
        self.subpath_sized(offset, self.size - offset)
    }

    /// Path of `size` nibbles starting at `offset`
    pub fn subpath_sized(&self, offset: usize, size: usize) -> Self {
        assert!(
            offset + size <= self.size,
            "subpath {}+{} beyond path of {}",
            offset,
            size,
            self.size
        );
        if size == 0 {
            return TreeNodePath::new();
        }

        let start = offset + self.adjustment;
        let first_byte = start / 2;
        let last_byte = (start + size - 1) / 2;
        TreeNodePath {
            bytes: self.bytes[first_byte..=last_byte].to_vec(),
            adjustment: start % 2,
            size,
        }
    }

    /// Concatenate two paths
    pub fn join(lhs: &TreeNodePath, rhs: &TreeNodePath) -> Self {
        TreeNodePath::from_nibbles(lhs.nibbles().chain(rhs.nibbles()))
    }

    /// Concatenate two paths with one nibble in between
    pub fn join_with_nibble(lhs: &TreeNodePath, nibble: u8, rhs: &TreeNodePath) -> Self {
        TreeNodePath::from_nibbles(
            lhs.nibbles()
                .chain(std::iter::once(nibble & 0x0F))
                .chain(rhs.nibbles()),
        )
    }

    /// Index of the first nibble where the paths diverge, or the shorter
    /// length when one is a prefix of the other
    pub fn find_first_difference_index(lhs: &TreeNodePath, rhs: &TreeNodePath) -> usize {
        lhs.nibbles()
            .zip(rhs.nibbles())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Encode for hashing: a flag byte (0x20 leaf, 0x10 odd) carrying the
    /// first nibble when the length is odd, then the nibbles two per byte
    pub fn encode_with_flags(&self, is_leaf: bool) -> Vec<u8> {
        let mut flags = if is_leaf { LEAF_FLAG } else { 0 };
        let mut encoded = Vec::with_capacity(1 + self.size / 2);

        let rest = if self.size % 2 == 1 {
            flags |= ODD_FLAG | self.nibble_at(0);
            1
        } else {
            0
        };
        encoded.push(flags);

        let mut i = rest;
        while i < self.size {
            encoded.push(self.nibble_at(i) << 4 | self.nibble_at(i + 1));
            i += 2;
        }

        encoded
    }

    /// Nibbles packed two per byte from index 0; an odd path ends with a
    /// zero filler nibble
    pub fn raw_bytes(&self) -> Vec<u8> {
        let mut packed = Vec::with_capacity((self.size + 1) / 2);
        let mut i = 0;
        while i < self.size {
            let high = self.nibble_at(i) << 4;
            let low = if i + 1 < self.size { self.nibble_at(i + 1) } else { 0 };
            packed.push(high | low);
            i += 2;
        }
        packed
    }
}

impl PartialEq for TreeNodePath {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && TreeNodePath::find_first_difference_index(self, other) == self.size
    }
}

impl Eq for TreeNodePath {}

impl Hash for TreeNodePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.size.hash(state);
        for nibble in self.nibbles() {
            nibble.hash(state);
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for TreeNodePath {
                fn from(key: $ty) -> Self {
                    TreeNodePath::from_bytes(key.to_be_bytes().to_vec())
                }
            }
        )*
    };
}

impl_from_scalar!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

impl From<&[u8]> for TreeNodePath {
    fn from(bytes: &[u8]) -> Self {
        TreeNodePath::from_bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for TreeNodePath {
    fn from(bytes: Vec<u8>) -> Self {
        TreeNodePath::from_bytes(bytes)
    }
}

impl<const N: usize> From<[u8; N]> for TreeNodePath {
    fn from(bytes: [u8; N]) -> Self {
        TreeNodePath::from_bytes(bytes.to_vec())
    }
}

impl From<Hash256> for TreeNodePath {
    fn from(hash: Hash256) -> Self {
        TreeNodePath::from_bytes(hash.as_bytes().to_vec())
    }
}

impl fmt::Debug for TreeNodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeNodePath(")?;
        for nibble in self.nibbles() {
            write!(f, "{:X}", nibble)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for TreeNodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( ")?;
        for nibble in self.nibbles() {
            write!(f, "{:X} ", nibble)?;
        }
        write!(f, ")")
    }
}
