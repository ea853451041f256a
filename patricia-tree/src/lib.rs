//! # Compact Merkle Patricia Tree
//!
//! A radix-16 tree over fixed-width keys whose root hash commits to every
//! key/value pair it holds.
//!
//! Used for:
//! - State commitments (one root hash summarizing a key/value store)
//! - Inclusion and exclusion proofs for single keys
//! - Batching mutations in a delta and committing them atomically
//!
//! Key features:
//! - Path compression: leaves and branches carry nibble paths
//! - Layered data sources (memory, read-through, persistent)
//! - Base/delta separation with checkpoints and reset

pub mod base_tree;
pub mod changes;
pub mod codec;
pub mod data_source;
pub mod encoder;
pub mod hash;
pub mod node;
pub mod path;
pub mod persistent;
pub mod proof;
pub mod tree;

#[cfg(test)]
mod test_utils;

pub use base_tree::{BasePatriciaTree, PatriciaTreeDelta};
pub use changes::{apply_changes, ChangeSet};
pub use codec::DecodeError;
pub use data_source::{DataSource, DataSourceVerbosity, MemoryDataSource, ReadThroughDataSource};
pub use encoder::{PassThroughEncoder, Sha3ValueEncoder, TreeEncoder};
pub use hash::{sha3_256, Hash256, HashBuilder};
pub use node::{BranchTreeNode, LeafTreeNode, TreeNode};
pub use path::TreeNodePath;
pub use persistent::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PersistentDataSource};
pub use proof::Proof;
pub use tree::PatriciaTree;

pub use patricia_error::{Error, ErrorKind, ErrorStatus, Result};
