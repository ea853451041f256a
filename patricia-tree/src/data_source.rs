//! # Data Sources
//!
//! Content-addressed node stores. A node is stored under its own hash, so
//! identical subtrees collapse to one entry.
//!
//! - `MemoryDataSource`: a plain in-process map
//! - `ReadThroughDataSource`: a private memory overlay over any other source
//! - `PersistentDataSource` (see `persistent`): nodes serialized into a
//!   byte-keyed store
//!
//! A miss is `Ok(None)`, never an error. Errors only come from a store that
//! could not be read or written.

use crate::hash::Hash256;
use crate::node::TreeNode;
use parking_lot::RwLock;
use patricia_error::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// Interface for storing tree nodes by hash
pub trait DataSource {
    /// Get a node by hash
    fn get(&self, hash: &Hash256) -> Result<Option<TreeNode>>;

    /// Store a node under its hash
    fn set(&mut self, node: &TreeNode) -> Result<()>;
}

/// A source shared between a base tree and the deltas layered on it.
/// Reads take the read lock, writes take the write lock.
impl<D: DataSource> DataSource for Arc<RwLock<D>> {
    fn get(&self, hash: &Hash256) -> Result<Option<TreeNode>> {
        self.read().get(hash)
    }

    fn set(&mut self, node: &TreeNode) -> Result<()> {
        self.write().set(node)
    }
}

/// Whether a memory source traces each stored node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSourceVerbosity {
    #[default]
    Off,
    Verbose,
}

/// In-memory node store
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSource {
    nodes: HashMap<Hash256, TreeNode>,
    verbosity: DataSourceVerbosity,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbosity(verbosity: DataSourceVerbosity) -> Self {
        MemoryDataSource {
            nodes: HashMap::new(),
            verbosity,
        }
    }

    /// Number of stored nodes
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, hash: &Hash256) -> bool {
        self.nodes.contains_key(hash)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Visit every stored node, in no particular order
    pub fn for_each(&self, mut f: impl FnMut(&TreeNode)) {
        for node in self.nodes.values() {
            f(node);
        }
    }

    /// Remove and return every stored node
    pub fn drain(&mut self) -> impl Iterator<Item = TreeNode> + '_ {
        self.nodes.drain().map(|(_, node)| node)
    }
}

impl DataSource for MemoryDataSource {
    fn get(&self, hash: &Hash256) -> Result<Option<TreeNode>> {
        Ok(self.nodes.get(hash).cloned())
    }

    fn set(&mut self, node: &TreeNode) -> Result<()> {
        if node.is_empty() {
            return Ok(());
        }

        let hash = node.hash();
        if self.nodes.contains_key(&hash) {
            return Ok(());
        }

        if self.verbosity == DataSourceVerbosity::Verbose {
            trace!(hash = %hash, path = %node.path(), leaf = node.is_leaf(), "storing node");
        }
        self.nodes.insert(hash, node.clone());
        Ok(())
    }
}

/// Memory overlay in front of a backing source.
///
/// Reads check the overlay, then the backing source. Writes and `clear`
/// only touch the overlay.
#[derive(Debug)]
pub struct ReadThroughDataSource<B> {
    overlay: MemoryDataSource,
    backing: B,
}

impl<B> ReadThroughDataSource<B> {
    pub fn new(backing: B) -> Self {
        Self::with_verbosity(backing, DataSourceVerbosity::Off)
    }

    pub fn with_verbosity(backing: B, verbosity: DataSourceVerbosity) -> Self {
        ReadThroughDataSource {
            overlay: MemoryDataSource::with_verbosity(verbosity),
            backing,
        }
    }

    /// Nodes written through this source and not yet flushed
    pub fn overlay(&self) -> &MemoryDataSource {
        &self.overlay
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    pub fn backing_mut(&mut self) -> &mut B {
        &mut self.backing
    }

    /// Drop the overlay; the backing source is untouched
    pub fn clear(&mut self) {
        self.overlay.clear();
    }

    /// Visit overlay nodes only
    pub fn for_each(&self, f: impl FnMut(&TreeNode)) {
        self.overlay.for_each(f);
    }
}

impl<B: DataSource> ReadThroughDataSource<B> {
    /// Move every overlay node into the backing source.
    ///
    /// Returns the number of nodes moved. On a backing failure the nodes not
    /// yet written stay in the overlay.
    pub fn flush(&mut self) -> Result<usize> {
        let pending: Vec<TreeNode> = self.overlay.drain().collect();
        for (i, node) in pending.iter().enumerate() {
            if let Err(err) = self.backing.set(node) {
                for unsaved in &pending[i..] {
                    self.overlay.set(unsaved)?;
                }
                return Err(err.with_operation("read_through::flush"));
            }
        }
        Ok(pending.len())
    }

    /// Move the overlay nodes reachable from `root` into the backing source,
    /// then drop the whole overlay.
    ///
    /// The walk stops at nodes the overlay does not hold: they are already
    /// in the backing source. Returns the number of nodes moved. On a backing
    /// failure the overlay is left as it was.
    pub fn flush_reachable(&mut self, root: &Hash256) -> Result<usize> {
        let mut visited = HashSet::new();
        let mut stack = vec![*root];
        let mut moved = 0;

        while let Some(hash) = stack.pop() {
            if !visited.insert(hash) {
                continue;
            }
            let node = match self.overlay.get(&hash)? {
                Some(node) => node,
                None => continue,
            };
            if let TreeNode::Branch(branch) = &node {
                stack.extend(branch.link_indexes().map(|index| branch.link(index)));
            }
            self.backing
                .set(&node)
                .map_err(|e| e.with_operation("read_through::flush_reachable"))?;
            moved += 1;
        }

        let dropped = self.overlay.size() - moved;
        self.overlay.clear();
        trace!(moved, dropped, "flushed reachable overlay nodes");
        Ok(moved)
    }
}

impl<B: DataSource> DataSource for ReadThroughDataSource<B> {
    fn get(&self, hash: &Hash256) -> Result<Option<TreeNode>> {
        if let Some(node) = self.overlay.get(hash)? {
            return Ok(Some(node));
        }
        self.backing.get(hash)
    }

    fn set(&mut self, node: &TreeNode) -> Result<()> {
        self.overlay.set(node)
    }
}
