//! # Change Sets
//!
//! A batch of added, modified and removed entries applied to a tree in one
//! call. Additions go first, then modifications, then removals, so a key
//! that appears in several groups ends up with the later group's effect.

use crate::data_source::DataSource;
use crate::encoder::TreeEncoder;
use crate::hash::Hash256;
use crate::tree::PatriciaTree;
use patricia_error::Result;

/// Grouped tree mutations
#[derive(Debug, Clone)]
pub struct ChangeSet<K, V> {
    pub added: Vec<(K, V)>,
    pub modified: Vec<(K, V)>,
    pub removed: Vec<K>,
}

impl<K, V> Default for ChangeSet<K, V> {
    fn default() -> Self {
        ChangeSet {
            added: Vec::new(),
            modified: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<K, V> ChangeSet<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, key: K, value: V) -> Self {
        self.added.push((key, value));
        self
    }

    pub fn modify(mut self, key: K, value: V) -> Self {
        self.modified.push((key, value));
        self
    }

    pub fn remove(mut self, key: K) -> Self {
        self.removed.push(key);
        self
    }

    /// Total number of changes across all groups
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Apply `changes` to `tree`, returning the new root hash
pub fn apply_changes<E, D>(
    tree: &mut PatriciaTree<E, D>,
    changes: &ChangeSet<E::Key, E::Value>,
) -> Result<Hash256>
where
    E: TreeEncoder,
    D: DataSource,
{
    for (key, value) in changes.added.iter().chain(&changes.modified) {
        tree.set(key, value)?;
    }

    for key in &changes.removed {
        tree.unset(key)?;
    }

    Ok(tree.root())
}
