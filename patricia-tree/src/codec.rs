//! # Node Codec
//!
//! Binary node format used by persistent stores:
//!
//! ```text
//! leaf:   0xFF | nibble count (u8) | packed path | value (32)
//! branch: 0x00 | nibble count (u8) | packed path | link mask (u16 LE) | one hash (32) per set bit, ascending
//! ```
//!
//! An odd path is packed with a zero filler nibble at the end.

use crate::hash::Hash256;
use crate::node::{BranchTreeNode, LeafTreeNode, TreeNode};
use crate::path::TreeNodePath;
use patricia_error::{Error, Result};

const LEAF_MARKER: u8 = 0xFF;
const BRANCH_MARKER: u8 = 0x00;

/// Why stored bytes could not be turned back into a node
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("not enough data: needed {needed} bytes at offset {offset}, {available} available")]
    NotEnoughData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid node marker 0x{0:02X}")]
    InvalidMarker(u8),

    #[error("non-zero filler nibble 0x{0:X} in odd-length path")]
    NonZeroFiller(u8),
}

/// Serialize a non-empty node
pub fn serialize(node: &TreeNode) -> Result<Vec<u8>> {
    let (marker, path) = match node {
        TreeNode::Empty => {
            return Err(Error::invalid_argument("cannot serialize an empty node")
                .with_operation("codec::serialize"));
        }
        TreeNode::Leaf(leaf) => (LEAF_MARKER, leaf.path()),
        TreeNode::Branch(branch) => (BRANCH_MARKER, branch.path()),
    };

    let size = u8::try_from(path.len()).map_err(|_| {
        Error::invalid_argument(format!("path of {} nibbles does not fit the node format", path.len()))
            .with_operation("codec::serialize")
    })?;

    let mut bytes = vec![marker, size];
    bytes.extend_from_slice(&path.raw_bytes());

    match node {
        TreeNode::Leaf(leaf) => bytes.extend_from_slice(leaf.value().as_bytes()),
        TreeNode::Branch(branch) => {
            bytes.extend_from_slice(&branch.link_mask().to_le_bytes());
            for index in branch.link_indexes() {
                bytes.extend_from_slice(branch.link(index).as_bytes());
            }
        }
        TreeNode::Empty => {}
    }

    Ok(bytes)
}

/// Deserialize bytes written by [`serialize`]
pub fn deserialize(bytes: &[u8]) -> std::result::Result<TreeNode, DecodeError> {
    let mut reader = Reader { bytes, offset: 0 };

    let marker = reader.take(1)?[0];
    if marker != LEAF_MARKER && marker != BRANCH_MARKER {
        return Err(DecodeError::InvalidMarker(marker));
    }

    let size = reader.take(1)?[0] as usize;
    let packed = reader.take((size + 1) / 2)?.to_vec();
    if size % 2 == 1 {
        let filler = packed[packed.len() - 1] & 0x0F;
        if filler != 0 {
            return Err(DecodeError::NonZeroFiller(filler));
        }
    }
    let path = TreeNodePath::from_packed(packed, size);

    if marker == LEAF_MARKER {
        let value = reader.take_hash()?;
        return Ok(LeafTreeNode::new(path, value).into());
    }

    let mask_bytes = reader.take(2)?;
    let mask = u16::from_le_bytes([mask_bytes[0], mask_bytes[1]]);
    let mut branch = BranchTreeNode::new(path);
    for index in 0u8..16 {
        if mask & (1 << index) != 0 {
            branch.set_link(reader.take_hash()?, index);
        }
    }

    Ok(branch.into())
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, count: usize) -> std::result::Result<&'a [u8], DecodeError> {
        let available = self.bytes.len() - self.offset;
        if available < count {
            return Err(DecodeError::NotEnoughData {
                offset: self.offset,
                needed: count,
                available,
            });
        }

        let slice = &self.bytes[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    fn take_hash(&mut self) -> std::result::Result<Hash256, DecodeError> {
        let slice = self.take(Hash256::SIZE)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Hash256::new(bytes))
    }
}
