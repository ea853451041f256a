//! # Persistent Storage
//!
//! `PersistentDataSource` keeps nodes in a byte-keyed store, serialized
//! with the node codec. Stores implement [`KeyValueStore`]:
//!
//! - `MemoryKeyValueStore`: an ordered in-memory map, mainly for tests
//! - `FileKeyValueStore`: one file per node, named by the hex hash

use crate::codec;
use crate::data_source::DataSource;
use crate::hash::Hash256;
use crate::node::TreeNode;
use patricia_error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Byte store keyed by node hash
pub trait KeyValueStore {
    fn get(&self, key: &Hash256) -> Result<Option<Vec<u8>>>;

    fn put(&mut self, key: &Hash256, bytes: &[u8]) -> Result<()>;
}

/// Ordered in-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<Hash256, Vec<u8>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &Hash256> {
        self.entries.keys()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &Hash256) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &Hash256, bytes: &[u8]) -> Result<()> {
        self.entries.insert(*key, bytes.to_vec());
        Ok(())
    }
}

/// File-based store: `<base_path>/<HEX HASH>`
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    base_path: PathBuf,
}

impl FileKeyValueStore {
    /// Open a store, creating its directory if needed
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            Error::from(e)
                .with_operation("file_store::open")
                .with_context("path", base_path.display().to_string())
        })?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_to_path(&self, key: &Hash256) -> PathBuf {
        self.base_path.join(key.to_hex())
    }

    /// Every key with a file in the store. Entries that cannot be read or
    /// are not named by a hash are skipped.
    pub fn keys(&self) -> Result<Vec<Hash256>> {
        let entries = std::fs::read_dir(&self.base_path).map_err(|e| {
            Error::from(e)
                .with_operation("file_store::keys")
                .with_context("path", self.base_path.display().to_string())
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(path = %self.base_path.display(), error = %err, "skipping unreadable store entry");
                    continue;
                }
            };

            let name = entry.file_name();
            match name.to_str().and_then(|name| name.parse::<Hash256>().ok()) {
                Some(key) => keys.push(key),
                None => warn!(entry = ?name, "skipping store entry not named by a hash"),
            }
        }

        keys.sort();
        Ok(keys)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &Hash256) -> Result<Option<Vec<u8>>> {
        let path = self.key_to_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::from(e)
                .with_operation("file_store::get")
                .with_context("path", path.display().to_string())),
        }
    }

    fn put(&mut self, key: &Hash256, bytes: &[u8]) -> Result<()> {
        let path = self.key_to_path(key);
        std::fs::write(&path, bytes).map_err(|e| {
            Error::from(e)
                .with_operation("file_store::put")
                .with_context("path", path.display().to_string())
        })
    }
}

/// Data source over a [`KeyValueStore`].
///
/// The node count is not tracked by the source; the owner updates it with
/// [`set_size`](Self::set_size) after each batch of writes.
#[derive(Debug)]
pub struct PersistentDataSource<S> {
    store: S,
    size: u64,
}

impl<S: KeyValueStore> PersistentDataSource<S> {
    pub fn new(store: S) -> Self {
        Self::with_size(store, 0)
    }

    /// Reopen a store whose node count is already known
    pub fn with_size(store: S, size: u64) -> Self {
        PersistentDataSource { store, size }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

}

impl<S: KeyValueStore> DataSource for PersistentDataSource<S> {
    fn get(&self, hash: &Hash256) -> Result<Option<TreeNode>> {
        let Some(bytes) = self.store.get(hash)? else {
            return Ok(None);
        };

        codec::deserialize(&bytes).map(Some).map_err(|e| {
            Error::corrupt_node(hash.to_hex())
                .with_operation("persistent::get")
                .set_source(e)
        })
    }

    fn set(&mut self, node: &TreeNode) -> Result<()> {
        let bytes = codec::serialize(node).map_err(|e| e.with_operation("persistent::set"))?;
        self.store.put(&node.hash(), &bytes)
    }
}
