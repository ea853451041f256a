//! # Base Tree and Deltas
//!
//! A [`BasePatriciaTree`] holds the committed tree. Mutations happen in a
//! [`PatriciaTreeDelta`] obtained from [`rebase`](BasePatriciaTree::rebase)
//! and become visible in the base only on [`commit`](BasePatriciaTree::commit).
//!
//! Source layering, top to bottom:
//!
//! ```text
//! delta pending overlay       set / unset write here
//! delta checkpoint overlay    set_checkpoint moves pending nodes here
//! base overlay                commit copies checkpoint nodes here
//! backing source              flush moves base overlay nodes here
//! ```
//!
//! Only one attached delta may exist at a time. The base keeps a weak
//! handle to it, so dropping the delta frees the slot. Detached deltas read
//! the same base but can never be committed.

use crate::changes::{apply_changes, ChangeSet};
use crate::data_source::{DataSource, ReadThroughDataSource};
use crate::encoder::TreeEncoder;
use crate::hash::Hash256;
use crate::node::TreeNode;
use crate::proof::Proof;
use crate::tree::PatriciaTree;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use patricia_error::{Error, Result};
use std::sync::{Arc, Weak};
use tracing::debug;

type SharedSource<B> = Arc<RwLock<ReadThroughDataSource<B>>>;

/// Pending overlay over checkpoint overlay over the base source
type DeltaSource<B> = ReadThroughDataSource<ReadThroughDataSource<SharedSource<B>>>;

struct DeltaState<E, B> {
    tree: PatriciaTree<E, DeltaSource<B>>,
    base_root: Hash256,
}

impl<E: TreeEncoder, B: DataSource> DeltaState<E, B> {
    /// Keep the pending nodes the current root reaches; drop the rest
    fn checkpoint(&mut self) -> Result<usize> {
        let root = self.tree.root();
        self.tree.data_source_mut().flush_reachable(&root)
    }

    fn checkpoint_source(&self) -> &ReadThroughDataSource<SharedSource<B>> {
        self.tree.data_source().backing()
    }
}

/// Committed tree over a backing source
pub struct BasePatriciaTree<E, B> {
    data_source: SharedSource<B>,
    tree: PatriciaTree<E, SharedSource<B>>,
    attached: Weak<Mutex<DeltaState<E, B>>>,
}

impl<E: TreeEncoder, B: DataSource> BasePatriciaTree<E, B> {
    /// Create an empty base tree
    pub fn new(backing: B) -> Self {
        let data_source = Arc::new(RwLock::new(ReadThroughDataSource::new(backing)));
        let tree = PatriciaTree::new(Arc::clone(&data_source));
        BasePatriciaTree {
            data_source,
            tree,
            attached: Weak::new(),
        }
    }

    /// Open a base tree at a root already stored in `backing`.
    ///
    /// The zero hash opens an empty tree.
    pub fn with_root(backing: B, root: Hash256) -> Result<Self> {
        let mut base = Self::new(backing);
        if !root.is_zero() && !base.tree.try_load(&root)? {
            return Err(Error::unknown_root(root.to_hex()).with_operation("base_tree::with_root"));
        }
        Ok(base)
    }

    /// Committed root hash
    pub fn root(&self) -> Hash256 {
        self.tree.root()
    }

    pub fn lookup(&self, key: &E::Key, node_path: &mut Vec<TreeNode>) -> Result<Option<Hash256>> {
        self.tree.lookup(key, node_path)
    }

    pub fn get(&self, key: &E::Key) -> Result<Option<Hash256>> {
        self.tree.get(key)
    }

    pub fn prove(&self, key: &E::Key) -> Result<Proof> {
        self.tree.prove(key)
    }

    /// Base source: committed nodes over the backing source
    pub fn data_source(&self) -> RwLockReadGuard<'_, ReadThroughDataSource<B>> {
        self.data_source.read()
    }

    pub fn data_source_mut(&mut self) -> RwLockWriteGuard<'_, ReadThroughDataSource<B>> {
        self.data_source.write()
    }

    /// Whether an attached delta is alive
    pub fn has_attached_delta(&self) -> bool {
        self.attached.strong_count() > 0
    }

    /// Create the attached delta. Fails while another attached delta is alive.
    pub fn rebase(&mut self) -> Result<PatriciaTreeDelta<E, B>> {
        if self.has_attached_delta() {
            return Err(Error::delta_already_attached().with_operation("base_tree::rebase"));
        }

        let delta = self.create_delta(true);
        self.attached = Arc::downgrade(&delta.state);
        debug!(root = %self.root(), "attached delta");
        Ok(delta)
    }

    /// Create a delta whose changes can never be committed
    pub fn rebase_detached(&self) -> PatriciaTreeDelta<E, B> {
        debug!(root = %self.root(), "created detached delta");
        self.create_delta(false)
    }

    /// Copy the attached delta's nodes into the base source and adopt its root.
    ///
    /// Uncheckpointed changes are checkpointed first. The delta stays
    /// attached, and committing again without new changes leaves the root
    /// unchanged.
    pub fn commit(&mut self) -> Result<()> {
        let state = self
            .attached
            .upgrade()
            .ok_or_else(|| Error::no_delta_attached().with_operation("base_tree::commit"))?;

        let (nodes, root) = {
            let mut state = state.lock();
            state.checkpoint()?;

            let mut nodes = Vec::new();
            state.checkpoint_source().for_each(|node| nodes.push(node.clone()));
            (nodes, state.tree.root_node().clone())
        };

        {
            let mut source = self.data_source.write();
            for node in &nodes {
                source.set(node).map_err(|e| e.with_operation("base_tree::commit"))?;
            }
        }
        self.tree.set_root(root);

        debug!(nodes = nodes.len(), root = %self.root(), "committed delta");
        Ok(())
    }

    /// Move committed nodes into the backing source, returning how many moved
    pub fn flush(&mut self) -> Result<usize> {
        let moved = self.data_source.write().flush()?;
        debug!(nodes = moved, root = %self.root(), "flushed base tree");
        Ok(moved)
    }

    fn create_delta(&self, attached: bool) -> PatriciaTreeDelta<E, B> {
        let checkpoint = ReadThroughDataSource::new(Arc::clone(&self.data_source));
        let mut tree = PatriciaTree::new(ReadThroughDataSource::new(checkpoint));
        tree.set_root(self.tree.root_node().clone());

        PatriciaTreeDelta {
            state: Arc::new(Mutex::new(DeltaState {
                tree,
                base_root: self.root(),
            })),
            attached,
        }
    }
}

/// Mutable view over a base tree.
///
/// Locks its own state before touching the base source, never the reverse.
pub struct PatriciaTreeDelta<E, B> {
    state: Arc<Mutex<DeltaState<E, B>>>,
    attached: bool,
}

impl<E: TreeEncoder, B: DataSource> PatriciaTreeDelta<E, B> {
    /// Current root hash, including uncommitted changes
    pub fn root(&self) -> Hash256 {
        self.state.lock().tree.root()
    }

    /// Root the delta was created from or last reset to
    pub fn base_root(&self) -> Hash256 {
        self.state.lock().base_root
    }

    /// Whether this delta can be committed
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn set(&mut self, key: &E::Key, value: &E::Value) -> Result<Hash256> {
        self.state.lock().tree.set(key, value)
    }

    pub fn unset(&mut self, key: &E::Key) -> Result<bool> {
        self.state.lock().tree.unset(key)
    }

    pub fn apply(&mut self, changes: &ChangeSet<E::Key, E::Value>) -> Result<Hash256> {
        apply_changes(&mut self.state.lock().tree, changes)
    }

    pub fn lookup(&self, key: &E::Key, node_path: &mut Vec<TreeNode>) -> Result<Option<Hash256>> {
        self.state.lock().tree.lookup(key, node_path)
    }

    pub fn get(&self, key: &E::Key) -> Result<Option<Hash256>> {
        self.state.lock().tree.get(key)
    }

    pub fn prove(&self, key: &E::Key) -> Result<Proof> {
        self.state.lock().tree.prove(key)
    }

    /// Move the pending nodes reachable from the current root into the
    /// checkpoint overlay and discard the others.
    ///
    /// The root hash is unaffected, and it becomes a valid
    /// [`reset`](Self::reset) target.
    pub fn set_checkpoint(&mut self) -> Result<()> {
        let moved = self.state.lock().checkpoint()?;
        debug!(nodes = moved, "checkpointed delta");
        Ok(())
    }

    /// Discard pending changes and move to `hash`.
    ///
    /// `hash` must be zero or a root stored in the checkpoint overlay or the
    /// base source. An unknown hash fails and leaves the delta unchanged.
    pub fn reset(&mut self, hash: &Hash256) -> Result<()> {
        let mut state = self.state.lock();

        if hash.is_zero() {
            state.tree.data_source_mut().clear();
            state.tree.clear();
        } else {
            let node = state
                .checkpoint_source()
                .get(hash)?
                .ok_or_else(|| Error::unknown_root(hash.to_hex()).with_operation("delta::reset"))?;
            state.tree.data_source_mut().clear();
            state.tree.set_root(node);
        }
        state.base_root = *hash;

        debug!(root = %hash, "reset delta");
        Ok(())
    }

    /// Nodes written since the last checkpoint
    pub fn num_pending_nodes(&self) -> usize {
        self.state.lock().tree.data_source().overlay().size()
    }

    /// Nodes held by the checkpoint overlay
    pub fn num_checkpoint_nodes(&self) -> usize {
        self.state.lock().checkpoint_source().overlay().size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::MemoryDataSource;
    use crate::test_utils::{reachable_hashes, value_hash, TestEncoder};
    use patricia_error::ErrorKind;

    type TestBase = BasePatriciaTree<TestEncoder, MemoryDataSource>;

    const PUPPY_ENTRIES: [(u32, &str); 4] = [
        (0x646F_0000, "verb"),
        (0x646F_6700, "puppy"),
        (0x646F_6765, "coin"),
        (0x686F_7273, "stallion"),
    ];

    fn plain_tree(entries: &[(u32, &'static str)]) -> PatriciaTree<TestEncoder, MemoryDataSource> {
        let mut tree = PatriciaTree::new(MemoryDataSource::new());
        for (key, value) in entries {
            tree.set(key, value).unwrap();
        }
        tree
    }

    fn seeded_base() -> TestBase {
        let mut base = TestBase::new(MemoryDataSource::new());
        let mut delta = base.rebase().unwrap();
        for (key, value) in &PUPPY_ENTRIES {
            delta.set(key, value).unwrap();
        }
        base.commit().unwrap();
        base
    }

    // =========================================================================
    // Root and lookup
    // =========================================================================

    #[test]
    fn test_empty_base_root() {
        let mut base = TestBase::new(MemoryDataSource::new());
        assert_eq!(base.root(), Hash256::ZERO);

        let delta = base.rebase().unwrap();
        assert_eq!(delta.root(), Hash256::ZERO);
        assert_eq!(delta.base_root(), Hash256::ZERO);
    }

    #[test]
    fn test_base_root_matches_plain_tree() {
        let mut base = seeded_base();
        assert_eq!(base.root(), plain_tree(&PUPPY_ENTRIES).root());

        let delta = base.rebase().unwrap();
        assert_eq!(delta.root(), base.root());
        assert_eq!(delta.base_root(), base.root());
    }

    #[test]
    fn test_lookup_forwards_to_tree() {
        let base = seeded_base();

        let mut node_path = Vec::new();
        assert_eq!(base.lookup(&0x646F_6765, &mut node_path).unwrap(), Some(value_hash("coin")));
        assert_eq!(node_path.len(), 3);

        node_path.clear();
        assert_eq!(base.lookup(&0x646F_6766, &mut node_path).unwrap(), None);
        assert_eq!(base.get(&0x686F_7273).unwrap(), Some(value_hash("stallion")));
    }

    #[test]
    fn test_with_root() {
        let base = seeded_base();
        let root = base.root();
        let source = base.data_source();

        let mut backing = MemoryDataSource::new();
        source.for_each(|node| backing.set(node).unwrap());

        let reopened = TestBase::with_root(backing, root).unwrap();
        assert_eq!(reopened.root(), root);
        assert_eq!(reopened.get(&0x646F_6700).unwrap(), Some(value_hash("puppy")));
    }

    #[test]
    fn test_with_zero_root() {
        let base = TestBase::with_root(MemoryDataSource::new(), Hash256::ZERO).unwrap();
        assert_eq!(base.root(), Hash256::ZERO);
    }

    #[test]
    fn test_with_unknown_root() {
        let err = TestBase::with_root(MemoryDataSource::new(), value_hash("nowhere"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::UnknownRoot);
        assert_eq!(err.operation(), "base_tree::with_root");
    }

    // =========================================================================
    // Rebase
    // =========================================================================

    #[test]
    fn test_rebase_allows_one_attached_delta() {
        let mut base = seeded_base();
        let delta = base.rebase().unwrap();
        assert!(delta.is_attached());
        assert!(base.has_attached_delta());

        let err = base.rebase().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DeltaAlreadyAttached);

        drop(delta);
        assert!(!base.has_attached_delta());
        assert!(base.rebase().is_ok());
    }

    #[test]
    fn test_rebase_detached_allows_many() {
        let mut base = seeded_base();
        let _attached = base.rebase().unwrap();

        let first = base.rebase_detached();
        let second = base.rebase_detached();
        assert!(!first.is_attached());
        assert_eq!(first.root(), base.root());
        assert_eq!(second.root(), base.root());
    }

    // =========================================================================
    // Commit
    // =========================================================================

    #[test]
    fn test_commit_without_delta() {
        let mut base = seeded_base();

        let err = base.commit().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDeltaAttached);
        assert_eq!(err.operation(), "base_tree::commit");
    }

    #[test]
    fn test_commit_with_only_detached_deltas() {
        let mut base = seeded_base();
        let mut detached = base.rebase_detached();
        detached.set(&0x2654_3210, &"alpha").unwrap();

        let err = base.commit().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDeltaAttached);
    }

    #[test]
    fn test_commit_changes_base() {
        let mut base = seeded_base();
        let mut delta = base.rebase().unwrap();
        delta.set(&0x2654_3210, &"alpha").unwrap();
        delta.unset(&0x646F_6765).unwrap();
        delta.set(&0x646F_0000, &"noun").unwrap();

        base.commit().unwrap();

        let expected = plain_tree(&[
            (0x646F_0000, "noun"),
            (0x646F_6700, "puppy"),
            (0x686F_7273, "stallion"),
            (0x2654_3210, "alpha"),
        ]);
        assert_eq!(base.root(), expected.root());
        assert_eq!(base.root(), delta.root());
        assert_eq!(base.get(&0x646F_6765).unwrap(), None);
        assert_eq!(base.get(&0x2654_3210).unwrap(), Some(value_hash("alpha")));
    }

    #[test]
    fn test_commit_is_idempotent() {
        let mut base = seeded_base();
        let mut delta = base.rebase().unwrap();
        delta.set(&0x2654_3210, &"alpha").unwrap();

        base.commit().unwrap();
        let root = base.root();
        let size = base.data_source().overlay().size();

        base.commit().unwrap();
        assert_eq!(base.root(), root);
        assert_eq!(base.data_source().overlay().size(), size);
    }

    #[test]
    fn test_uncommitted_changes_do_not_change_base() {
        let mut base = seeded_base();
        let root = base.root();

        let mut delta = base.rebase().unwrap();
        delta.set(&0x2654_3210, &"alpha").unwrap();
        delta.set_checkpoint().unwrap();

        assert_ne!(delta.root(), root);
        assert_eq!(base.root(), root);
        assert_eq!(base.get(&0x2654_3210).unwrap(), None);
        assert_eq!(delta.get(&0x2654_3210).unwrap(), Some(value_hash("alpha")));
    }

    #[test]
    fn test_detached_changes_are_invisible() {
        let mut base = seeded_base();
        let root = base.root();
        let mut attached = base.rebase().unwrap();
        let mut detached = base.rebase_detached();

        detached.set(&0x2654_3210, &"alpha").unwrap();
        attached.set(&0x4654_3210, &"lion").unwrap();
        base.commit().unwrap();

        assert_ne!(base.root(), root);
        assert_eq!(base.get(&0x2654_3210).unwrap(), None);
        assert_eq!(base.get(&0x4654_3210).unwrap(), Some(value_hash("lion")));
        assert_eq!(attached.get(&0x2654_3210).unwrap(), None);
    }

    #[test]
    fn test_commit_respects_checkpoint_groups() {
        let mut base = seeded_base();
        let mut delta = base.rebase().unwrap();

        delta.set(&0x2654_3210, &"alpha").unwrap();
        delta.unset(&0x646F_6765).unwrap();
        delta.set(&0x646F_0000, &"noun").unwrap();
        delta.set_checkpoint().unwrap();
        let root1 = delta.root();

        delta.set(&0x2654_3211, &"beta").unwrap();
        delta.unset(&0x686F_7273).unwrap();
        delta.set(&0x646F_6700, &"kitten").unwrap();
        delta.set_checkpoint().unwrap();
        let root2 = delta.root();

        base.commit().unwrap();

        let source = base.data_source();
        assert!(source.get(&root1).unwrap().is_some());
        assert!(source.get(&root2).unwrap().is_some());
        drop(source);

        for key in [0x2654_3210, 0x646F_0000, 0x2654_3211, 0x646F_6700] {
            assert!(base.get(&key).unwrap().is_some(), "{:08X} should be found", key);
        }
    }

    #[test]
    fn test_commit_stores_only_checkpointed_subtrees() {
        let mut base = TestBase::new(MemoryDataSource::new());
        let mut delta = base.rebase().unwrap();

        // B(alpha, noun), L(alpha), L(noun)
        delta.set(&0x2654_3210, &"alpha").unwrap();
        delta.set(&0x646F_0000, &"noun").unwrap();
        delta.set_checkpoint().unwrap();
        let root1 = delta.root();
        assert_eq!(delta.num_checkpoint_nodes(), 3);

        // B(alpha, B(noun, verb)), B(noun, verb), L(noun), L(verb)
        delta.set(&0x646F_1111, &"verb").unwrap();
        delta.set_checkpoint().unwrap();
        assert_eq!(delta.num_checkpoint_nodes(), 7);
        base.commit().unwrap();

        let source = base.data_source();
        assert_eq!(source.overlay().size(), 7);
        assert!(source.overlay().contains(&root1));
        assert!(source.overlay().contains(&base.root()));
        // the first checkpoint root and its noun leaf are no longer reachable
        assert_eq!(reachable_hashes(&*source, &base.root()).len(), 5);
        drop(source);

        for key in [0x2654_3210, 0x646F_0000, 0x646F_1111] {
            assert!(base.get(&key).unwrap().is_some(), "{:08X} should be found", key);
        }
        assert_eq!(base.flush().unwrap(), 7);
    }

    #[test]
    fn test_commit_then_set_then_commit() {
        let mut base = TestBase::new(MemoryDataSource::new());
        let mut delta = base.rebase().unwrap();

        delta.set(&0x646F_0000, &"verb").unwrap();
        base.commit().unwrap();
        delta.set(&0x646F_6700, &"puppy").unwrap();
        delta.unset(&0x646F_0000).unwrap();
        base.commit().unwrap();

        assert_eq!(base.root(), plain_tree(&[(0x646F_6700, "puppy")]).root());
    }

    // =========================================================================
    // Checkpoint and reset
    // =========================================================================

    #[test]
    fn test_set_checkpoint_keeps_root() {
        let mut base = seeded_base();
        let mut delta = base.rebase().unwrap();
        delta.set(&0x2654_3210, &"alpha").unwrap();
        let root = delta.root();
        let pending = delta.num_pending_nodes();
        assert!(pending > 0);

        delta.set_checkpoint().unwrap();
        assert_eq!(delta.root(), root);
        assert_eq!(delta.num_pending_nodes(), 0);
        assert_eq!(delta.num_checkpoint_nodes(), pending);
    }

    #[test]
    fn test_reset_to_base_root() {
        let mut base = seeded_base();
        let root = base.root();
        let mut delta = base.rebase().unwrap();
        delta.set(&0x2654_3210, &"alpha").unwrap();
        delta.unset(&0x646F_6765).unwrap();

        delta.reset(&root).unwrap();
        assert_eq!(delta.root(), root);
        assert_eq!(delta.base_root(), root);
        assert_eq!(delta.num_pending_nodes(), 0);
        assert_eq!(delta.get(&0x646F_6765).unwrap(), Some(value_hash("coin")));

        base.commit().unwrap();
        assert_eq!(base.root(), root);
    }

    #[test]
    fn test_reset_to_previous_base_root() {
        let mut base = seeded_base();
        let root1 = base.root();
        let mut delta = base.rebase().unwrap();
        delta.set(&0x2654_3210, &"alpha").unwrap();
        base.commit().unwrap();
        let root2 = base.root();
        assert_ne!(root1, root2);

        delta.reset(&root1).unwrap();
        assert_eq!(delta.root(), root1);
        assert_eq!(delta.get(&0x2654_3210).unwrap(), None);

        base.commit().unwrap();
        assert_eq!(base.root(), root1);
    }

    #[test]
    fn test_reset_to_empty_root() {
        let mut base = seeded_base();
        let mut delta = base.rebase().unwrap();

        delta.reset(&Hash256::ZERO).unwrap();
        assert_eq!(delta.root(), Hash256::ZERO);
        assert_eq!(delta.base_root(), Hash256::ZERO);
        assert_eq!(delta.get(&0x646F_6700).unwrap(), None);

        base.commit().unwrap();
        assert_eq!(base.root(), Hash256::ZERO);
    }

    #[test]
    fn test_reset_to_unknown_root() {
        let mut base = seeded_base();
        let mut delta = base.rebase().unwrap();
        delta.set(&0x2654_3210, &"alpha").unwrap();
        let root = delta.root();

        let err = delta.reset(&value_hash("nowhere")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownRoot);
        assert_eq!(delta.root(), root);
        assert_eq!(delta.get(&0x2654_3210).unwrap(), Some(value_hash("alpha")));
    }

    #[test]
    fn test_reset_to_checkpointed_root() {
        let mut base = seeded_base();
        let mut delta = base.rebase().unwrap();

        delta.set(&0x2654_3210, &"alpha").unwrap();
        delta.set_checkpoint().unwrap();
        let checkpointed = delta.root();

        delta.set(&0x2654_3211, &"beta").unwrap();
        let pending = delta.root();

        delta.reset(&checkpointed).unwrap();
        assert_eq!(delta.root(), checkpointed);
        assert_eq!(delta.get(&0x2654_3211).unwrap(), None);

        // the pending root was discarded with its nodes
        let err = delta.reset(&pending).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownRoot);
    }

    #[test]
    fn test_set_and_unset_round_trip() {
        let mut base = seeded_base();
        let root = base.root();
        let mut delta = base.rebase().unwrap();

        delta.set(&0x2654_3210, &"alpha").unwrap();
        assert!(delta.unset(&0x2654_3210).unwrap());
        assert_eq!(delta.root(), root);

        assert!(delta.unset(&0x646F_6765).unwrap());
        delta.set(&0x646F_6765, &"coin").unwrap();
        assert_eq!(delta.root(), root);

        delta.set(&0x646F_6765, &"token").unwrap();
        assert_ne!(delta.root(), root);
        assert_eq!(delta.get(&0x646F_6765).unwrap(), Some(value_hash("token")));
    }

    #[test]
    fn test_apply_change_set() {
        let mut base = seeded_base();
        let mut delta = base.rebase().unwrap();

        let changes = ChangeSet::new()
            .add(0x2654_3210, "alpha")
            .modify(0x646F_0000, "noun")
            .remove(0x646F_6765);
        let root = delta.apply(&changes).unwrap();
        base.commit().unwrap();

        assert_eq!(base.root(), root);
        assert_eq!(base.get(&0x646F_0000).unwrap(), Some(value_hash("noun")));
    }

    #[test]
    fn test_proof_from_delta_and_base() {
        let mut base = seeded_base();
        let mut delta = base.rebase().unwrap();
        delta.set(&0x2654_3210, &"alpha").unwrap();

        let proof = delta.prove(&0x2654_3210).unwrap();
        assert!(proof.verify(&delta.root()));
        assert!(!base.prove(&0x2654_3210).unwrap().is_inclusion());

        base.commit().unwrap();
        assert!(base.prove(&0x2654_3210).unwrap().verify(&base.root()));
    }

    // =========================================================================
    // Flush
    // =========================================================================

    #[test]
    fn test_flush_moves_nodes_to_backing() {
        let backing = Arc::new(RwLock::new(MemoryDataSource::new()));
        let mut base = BasePatriciaTree::<TestEncoder, _>::new(Arc::clone(&backing));
        let mut delta = base.rebase().unwrap();
        for (key, value) in &PUPPY_ENTRIES {
            delta.set(key, value).unwrap();
        }
        base.commit().unwrap();
        assert_eq!(backing.read().size(), 0);

        let moved = base.flush().unwrap();
        assert!(moved > 0);
        assert_eq!(backing.read().size(), moved);
        assert!(base.data_source().overlay().is_empty());
        assert_eq!(base.get(&0x646F_6765).unwrap(), Some(value_hash("coin")));

        drop(delta);
        drop(base);
        let root = plain_tree(&PUPPY_ENTRIES).root();
        let reopened = BasePatriciaTree::<TestEncoder, _>::with_root(Arc::clone(&backing), root)
            .ok()
            .unwrap();
        assert_eq!(reopened.get(&0x686F_7273).unwrap(), Some(value_hash("stallion")));
    }

    #[test]
    fn test_detached_delta_survives_flush() {
        let backing = Arc::new(RwLock::new(MemoryDataSource::new()));
        let mut base = BasePatriciaTree::<TestEncoder, _>::new(Arc::clone(&backing));
        let mut delta = base.rebase().unwrap();
        delta.set(&0x646F_6700, &"puppy").unwrap();
        base.commit().unwrap();

        let detached = base.rebase_detached();
        base.flush().unwrap();
        assert_eq!(detached.get(&0x646F_6700).unwrap(), Some(value_hash("puppy")));
    }
}
