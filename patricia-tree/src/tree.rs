//! # Patricia Tree
//!
//! The radix-16 tree with set, unset and lookup. Nodes reference their
//! children by hash and live in a [`DataSource`]. A node is saved to the
//! source when it becomes a link target, and the root is saved after every
//! mutation, so the source always holds the whole reachable tree.

use crate::data_source::DataSource;
use crate::encoder::TreeEncoder;
use crate::hash::Hash256;
use crate::node::{BranchTreeNode, LeafTreeNode, TreeNode};
use crate::path::TreeNodePath;
use crate::proof::Proof;
use patricia_error::{Error, Result};
use std::marker::PhantomData;

/// Compact Merkle Patricia tree
pub struct PatriciaTree<E, D> {
    root: TreeNode,
    data_source: D,
    /// Nibble count of every key in the tree, known once a leaf was seen
    key_width: Option<usize>,
    _encoder: PhantomData<fn() -> E>,
}

impl<E: TreeEncoder, D: DataSource> PatriciaTree<E, D> {
    /// Create an empty tree over `data_source`
    pub fn new(data_source: D) -> Self {
        PatriciaTree {
            root: TreeNode::Empty,
            data_source,
            key_width: None,
            _encoder: PhantomData,
        }
    }

    /// Root hash; zero for an empty tree
    pub fn root(&self) -> Hash256 {
        self.root.hash()
    }

    pub fn root_node(&self) -> &TreeNode {
        &self.root
    }

    pub fn data_source(&self) -> &D {
        &self.data_source
    }

    pub fn data_source_mut(&mut self) -> &mut D {
        &mut self.data_source
    }

    // =========================================================================
    // Set
    // =========================================================================

    /// Set `key` to `value`, returning the new root hash.
    ///
    /// Fails with `InvalidArgument` when the key width differs from the
    /// keys already in the tree.
    pub fn set(&mut self, key: &E::Key, value: &E::Value) -> Result<Hash256> {
        let path: TreeNodePath = E::encode_key(key).into();
        let value = E::encode_value(value);
        self.check_key_width(&path).map_err(|e| e.with_operation("tree::set"))?;
        let path_width = path.len();

        let root = self.root.clone();
        let updated = self
            .set_node(root, path, value)
            .map_err(|e| e.with_operation("tree::set"))?;
        self.save(&updated)?;
        self.root = updated;
        self.key_width = Some(path_width);
        Ok(self.root())
    }

    fn check_key_width(&mut self, path: &TreeNodePath) -> Result<()> {
        let width = match self.key_width {
            Some(width) => width,
            None => match self.stored_key_width()? {
                Some(width) => width,
                None => return Ok(()),
            },
        };
        self.key_width = Some(width);

        if width != path.len() {
            return Err(Error::invalid_argument("keys of one tree must all have the same width")
                .with_context("expected", width.to_string())
                .with_context("nibbles", path.len().to_string()));
        }
        Ok(())
    }

    /// Key width read off the leftmost root-to-leaf walk
    fn stored_key_width(&self) -> Result<Option<usize>> {
        let mut node = self.root.clone();
        let mut width = 0;
        loop {
            let branch = match node {
                TreeNode::Empty => return Ok(None),
                TreeNode::Leaf(leaf) => return Ok(Some(width + leaf.path().len())),
                TreeNode::Branch(branch) => branch,
            };

            let index = branch
                .link_indexes()
                .next()
                .ok_or_else(|| Error::unexpected("branch without links").with_operation("tree::stored_key_width"))?;
            width += branch.path().len() + 1;
            node = self.linked_node(&branch, index)?;
        }
    }

    fn set_node(&mut self, node: TreeNode, path: TreeNodePath, value: Hash256) -> Result<TreeNode> {
        match node {
            TreeNode::Empty => Ok(LeafTreeNode::new(path, value).into()),
            TreeNode::Leaf(leaf) if leaf.path() == &path => Ok(LeafTreeNode::new(path, value).into()),
            TreeNode::Leaf(leaf) => self.branch_leaf_node(leaf, path, value),
            TreeNode::Branch(branch) => self.insert_into_branch(branch, path, value),
        }
    }

    /// Replace a leaf by a branch over the shared prefix of both paths
    fn branch_leaf_node(&mut self, leaf: LeafTreeNode, path: TreeNodePath, value: Hash256) -> Result<TreeNode> {
        let leaf_path = leaf.path();
        let d = TreeNodePath::find_first_difference_index(leaf_path, &path);
        ensure_divergence(d, leaf_path.len().min(path.len()))?;

        let mut branch = BranchTreeNode::new(leaf_path.subpath_sized(0, d));
        let existing = LeafTreeNode::new(leaf_path.subpath(d + 1), *leaf.value());
        let inserted = LeafTreeNode::new(path.subpath(d + 1), value);

        self.set_link(&mut branch, existing.into(), leaf_path.nibble_at(d))?;
        self.set_link(&mut branch, inserted.into(), path.nibble_at(d))?;
        Ok(branch.into())
    }

    fn insert_into_branch(&mut self, mut branch: BranchTreeNode, path: TreeNodePath, value: Hash256) -> Result<TreeNode> {
        let branch_path = branch.path().clone();
        let d = TreeNodePath::find_first_difference_index(&branch_path, &path);
        ensure_divergence(d, path.len())?;

        if d == branch_path.len() {
            // the branch prefix is consumed: descend into the selected link
            let index = path.nibble_at(d);
            let next = self.linked_node(&branch, index)?;
            let updated = self.set_node(next, path.subpath(d + 1), value)?;
            self.set_link(&mut branch, updated, index)?;
            return Ok(branch.into());
        }

        // divergence inside the prefix: split the branch under a new parent
        let mut parent = BranchTreeNode::new(branch_path.subpath_sized(0, d));
        let inserted = LeafTreeNode::new(path.subpath(d + 1), value);
        self.set_link(&mut parent, inserted.into(), path.nibble_at(d))?;

        branch.set_path(branch_path.subpath(d + 1));
        self.set_link(&mut parent, branch.into(), branch_path.nibble_at(d))?;
        Ok(parent.into())
    }

    // =========================================================================
    // Unset
    // =========================================================================

    /// Remove `key`. Returns false when the key is not in the tree.
    ///
    /// At most one branch collapses per removal: the lowest branch left with
    /// a single link is merged into its remaining child, and every ancestor
    /// only has its link updated.
    pub fn unset(&mut self, key: &E::Key) -> Result<bool> {
        let path: TreeNodePath = E::encode_key(key).into();
        let mut can_merge = true;

        let root = self.root.clone();
        let updated = self
            .unset_node(&root, &path, &mut can_merge)
            .map_err(|e| e.with_operation("tree::unset"))?;

        match updated {
            None => Ok(false),
            Some(updated) => {
                self.save(&updated)?;
                if updated.is_empty() {
                    self.key_width = None;
                }
                self.root = updated;
                Ok(true)
            }
        }
    }

    /// `None` when the key is absent, otherwise the replacement node
    fn unset_node(&mut self, node: &TreeNode, path: &TreeNodePath, can_merge: &mut bool) -> Result<Option<TreeNode>> {
        let branch = match node {
            TreeNode::Empty => return Ok(None),
            TreeNode::Leaf(leaf) => return Ok((leaf.path() == path).then_some(TreeNode::Empty)),
            TreeNode::Branch(branch) => branch,
        };

        let d = TreeNodePath::find_first_difference_index(branch.path(), path);
        if d != branch.path().len() || d >= path.len() {
            return Ok(None);
        }

        let index = path.nibble_at(d);
        let next = self.linked_node(branch, index)?;
        let Some(updated_next) = self.unset_node(&next, &path.subpath(d + 1), can_merge)? else {
            return Ok(None);
        };

        let mut branch = branch.clone();
        let updated = if *can_merge {
            self.unset_branch_link(branch, index)?
        } else {
            self.set_link(&mut branch, updated_next, index)?;
            branch.into()
        };

        *can_merge = false;
        Ok(Some(updated))
    }

    /// Clear a link; a branch left with one link collapses into that child
    fn unset_branch_link(&self, mut branch: BranchTreeNode, index: u8) -> Result<TreeNode> {
        branch.clear_link(index);
        if branch.num_links() != 1 {
            return Ok(branch.into());
        }

        let last = branch
            .highest_link_index()
            .ok_or_else(|| Error::unexpected("branch with one link has no highest link"))?;
        let mut child = self.linked_node(&branch, last)?;
        let merged = TreeNodePath::join_with_nibble(branch.path(), last, child.path());
        child.set_path(merged);
        Ok(child)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Look up `key`, pushing every visited node onto `node_path`.
    ///
    /// On a hit the path ends at the matching leaf. On a miss it ends at a
    /// leaf with a different path, or at the branch where the walk stopped.
    pub fn lookup(&self, key: &E::Key, node_path: &mut Vec<TreeNode>) -> Result<Option<Hash256>> {
        let mut path: TreeNodePath = E::encode_key(key).into();
        let mut node = self.root.clone();

        loop {
            if node.is_empty() {
                return Ok(None);
            }
            node_path.push(node.clone());

            let branch = match &node {
                TreeNode::Branch(branch) => branch,
                TreeNode::Leaf(leaf) => return Ok((leaf.path() == &path).then(|| *leaf.value())),
                TreeNode::Empty => return Ok(None),
            };

            let d = TreeNodePath::find_first_difference_index(branch.path(), &path);
            if d != branch.path().len() || d >= path.len() {
                return Ok(None);
            }

            let next = self.linked_node(branch, path.nibble_at(d))?;
            path = path.subpath(d + 1);
            node = next;
        }
    }

    /// Look up `key` without collecting the node path
    pub fn get(&self, key: &E::Key) -> Result<Option<Hash256>> {
        self.lookup(key, &mut Vec::new())
    }

    /// Build a proof of inclusion or exclusion for `key`
    pub fn prove(&self, key: &E::Key) -> Result<Proof> {
        let mut nodes = Vec::new();
        let value = self.lookup(key, &mut nodes)?;
        Ok(Proof::new(E::encode_key(key).into(), value, nodes))
    }

    // =========================================================================
    // Root management
    // =========================================================================

    /// Make the stored node `hash` the root. Returns false if it is not stored.
    pub fn try_load(&mut self, hash: &Hash256) -> Result<bool> {
        match self.data_source.get(hash)? {
            Some(node) => {
                self.set_root(node);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the root without touching the data source
    pub fn set_root(&mut self, node: TreeNode) {
        self.root = node;
        self.key_width = None;
    }

    /// Forget the root; the data source keeps its nodes
    pub fn clear(&mut self) {
        self.root = TreeNode::Empty;
        self.key_width = None;
    }

    /// Save the root node. Everything below it is already stored once it is
    /// linked, so only a root installed by `set_root` can be missing.
    pub fn save_all(&mut self) -> Result<()> {
        let root = self.root.clone();
        self.save(&root)
    }

    // =========================================================================
    // Data source access
    // =========================================================================

    fn save(&mut self, node: &TreeNode) -> Result<()> {
        if node.is_empty() {
            return Ok(());
        }
        self.data_source.set(node)
    }

    fn linked_node(&self, branch: &BranchTreeNode, index: u8) -> Result<TreeNode> {
        if !branch.has_link(index) {
            return Ok(TreeNode::Empty);
        }

        let hash = branch.link(index);
        self.data_source
            .get(&hash)?
            .ok_or_else(|| Error::node_not_found(hash.to_hex()).with_operation("tree::linked_node"))
    }

    fn set_link(&mut self, branch: &mut BranchTreeNode, node: TreeNode, index: u8) -> Result<()> {
        self.save(&node)?;
        branch.set_link(node.hash(), index);
        Ok(())
    }
}

/// Two paths of one width must differ before either ends
fn ensure_divergence(difference_index: usize, key_size: usize) -> Result<()> {
    if difference_index >= key_size {
        return Err(Error::invalid_argument("key ends inside a stored path")
            .with_context("nibbles", key_size.to_string()));
    }
    Ok(())
}
