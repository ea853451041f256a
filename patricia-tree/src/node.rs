//! # Tree Nodes
//!
//! The tree has two node shapes:
//! 1. Leaf - the remaining key path and a value hash
//! 2. Branch - a shared path prefix and up to 16 links to child hashes
//!
//! `TreeNode` wraps either one, or nothing.

use crate::hash::{Hash256, HashBuilder};
use crate::path::TreeNodePath;

static EMPTY_PATH: TreeNodePath = TreeNodePath::new();

/// A terminal node. Immutable; its hash is computed on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafTreeNode {
    path: TreeNodePath,
    value: Hash256,
    hash: Hash256,
}

impl LeafTreeNode {
    pub fn new(path: TreeNodePath, value: Hash256) -> Self {
        let mut builder = HashBuilder::new();
        builder.update(path.encode_with_flags(true)).update(value);
        let hash = builder.finalize();

        LeafTreeNode { path, value, hash }
    }

    pub fn path(&self) -> &TreeNodePath {
        &self.path
    }

    pub fn value(&self) -> &Hash256 {
        &self.value
    }

    pub fn hash(&self) -> Hash256 {
        self.hash
    }
}

/// An inner node with 16 link slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTreeNode {
    path: TreeNodePath,
    links: [Hash256; 16],
    link_mask: u16,
    hash: Hash256,
}

impl BranchTreeNode {
    /// Create a branch with no links
    pub fn new(path: TreeNodePath) -> Self {
        let mut branch = BranchTreeNode {
            path,
            links: [Hash256::ZERO; 16],
            link_mask: 0,
            hash: Hash256::ZERO,
        };
        branch.rehash();
        branch
    }

    pub fn path(&self) -> &TreeNodePath {
        &self.path
    }

    pub fn set_path(&mut self, path: TreeNodePath) {
        self.path = path;
        self.rehash();
    }

    /// Bit `i` is set when link `i` is present
    pub fn link_mask(&self) -> u16 {
        self.link_mask
    }

    pub fn num_links(&self) -> usize {
        self.link_mask.count_ones() as usize
    }

    pub fn has_link(&self, index: u8) -> bool {
        self.link_mask & (1 << index) != 0
    }

    /// The hash at link `index`, zero when absent
    pub fn link(&self, index: u8) -> Hash256 {
        self.links[index as usize]
    }

    pub fn links(&self) -> &[Hash256; 16] {
        &self.links
    }

    pub fn set_link(&mut self, hash: Hash256, index: u8) {
        self.links[index as usize] = hash;
        self.link_mask |= 1 << index;
        self.rehash();
    }

    pub fn clear_link(&mut self, index: u8) {
        self.links[index as usize] = Hash256::ZERO;
        self.link_mask &= !(1 << index);
        self.rehash();
    }

    /// Index of the highest present link
    pub fn highest_link_index(&self) -> Option<u8> {
        if self.link_mask == 0 {
            None
        } else {
            Some(15 - self.link_mask.leading_zeros() as u8)
        }
    }

    /// Present link indexes in ascending order
    pub fn link_indexes(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..16).filter(move |i| self.has_link(*i))
    }

    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    fn rehash(&mut self) {
        let mut builder = HashBuilder::new();
        builder.update(self.path.encode_with_flags(false));
        for link in &self.links {
            builder.update(link);
        }
        self.hash = builder.finalize();
    }
}

/// Empty, a leaf or a branch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TreeNode {
    #[default]
    Empty,
    Leaf(LeafTreeNode),
    Branch(BranchTreeNode),
}

impl TreeNode {
    pub fn is_empty(&self) -> bool {
        matches!(self, TreeNode::Empty)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf(_))
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, TreeNode::Branch(_))
    }

    /// The node path; empty for an empty node
    pub fn path(&self) -> &TreeNodePath {
        match self {
            TreeNode::Empty => &EMPTY_PATH,
            TreeNode::Leaf(leaf) => leaf.path(),
            TreeNode::Branch(branch) => branch.path(),
        }
    }

    /// The node hash; zero for an empty node
    pub fn hash(&self) -> Hash256 {
        match self {
            TreeNode::Empty => Hash256::ZERO,
            TreeNode::Leaf(leaf) => leaf.hash(),
            TreeNode::Branch(branch) => branch.hash(),
        }
    }

    /// Replace the node path. A leaf is rebuilt around the new path.
    ///
    /// # Panics
    /// Panics on an empty node.
    pub fn set_path(&mut self, path: TreeNodePath) {
        match self {
            TreeNode::Empty => panic!("cannot set path of an empty node"),
            TreeNode::Leaf(leaf) => *leaf = LeafTreeNode::new(path, leaf.value),
            TreeNode::Branch(branch) => branch.set_path(path),
        }
    }

    /// # Panics
    /// Panics unless this is a leaf.
    pub fn as_leaf(&self) -> &LeafTreeNode {
        match self {
            TreeNode::Leaf(leaf) => leaf,
            other => panic!("expected leaf node, found {}", other.variant_name()),
        }
    }

    /// # Panics
    /// Panics unless this is a branch.
    pub fn as_branch(&self) -> &BranchTreeNode {
        match self {
            TreeNode::Branch(branch) => branch,
            other => panic!("expected branch node, found {}", other.variant_name()),
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            TreeNode::Empty => "empty",
            TreeNode::Leaf(_) => "leaf",
            TreeNode::Branch(_) => "branch",
        }
    }
}

impl From<LeafTreeNode> for TreeNode {
    fn from(leaf: LeafTreeNode) -> Self {
        TreeNode::Leaf(leaf)
    }
}

impl From<BranchTreeNode> for TreeNode {
    fn from(branch: BranchTreeNode) -> Self {
        TreeNode::Branch(branch)
    }
}
