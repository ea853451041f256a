//! # Proofs
//!
//! A proof is the list of nodes visited while looking a key up, from the
//! root down. It can be checked against a root hash without access to any
//! data source.

use crate::hash::Hash256;
use crate::node::TreeNode;
use crate::path::TreeNodePath;

/// Inclusion or exclusion proof for one key
#[derive(Debug, Clone)]
pub struct Proof {
    /// The encoded key being proven
    pub key_path: TreeNodePath,
    /// The leaf value, `None` when proving absence
    pub value: Option<Hash256>,
    /// Visited nodes, root first
    pub nodes: Vec<TreeNode>,
}

impl Proof {
    pub fn new(key_path: TreeNodePath, value: Option<Hash256>, nodes: Vec<TreeNode>) -> Self {
        Proof { key_path, value, nodes }
    }

    pub fn is_inclusion(&self) -> bool {
        self.value.is_some()
    }

    /// Verify the proof against a root hash.
    ///
    /// Every branch must link to the hash of the next node. An inclusion
    /// proof ends at a leaf holding the remaining key path and the value.
    /// An exclusion proof ends at a leaf with another path, or at a branch
    /// the key cannot continue through. The empty tree proves exclusion of
    /// every key with no nodes.
    pub fn verify(&self, root: &Hash256) -> bool {
        let Some(first) = self.nodes.first() else {
            return root.is_zero() && self.value.is_none();
        };
        if first.hash() != *root {
            return false;
        }

        let mut path = self.key_path.clone();
        for (i, node) in self.nodes.iter().enumerate() {
            let next = self.nodes.get(i + 1);

            match node {
                TreeNode::Empty => return false,

                TreeNode::Leaf(leaf) => {
                    if next.is_some() {
                        return false;
                    }

                    return match &self.value {
                        Some(value) => leaf.path() == &path && leaf.value() == value,
                        None => leaf.path() != &path,
                    };
                }

                TreeNode::Branch(branch) => {
                    let d = TreeNodePath::find_first_difference_index(branch.path(), &path);
                    let index = (d == branch.path().len() && d < path.len())
                        .then(|| path.nibble_at(d))
                        .filter(|index| branch.has_link(*index));

                    match (index, next) {
                        // the walk stops here: only absence can be proven
                        (None, None) => return self.value.is_none(),
                        (None, Some(_)) | (Some(_), None) => return false,
                        (Some(index), Some(next)) => {
                            if branch.link(index) != next.hash() {
                                return false;
                            }
                            path = path.subpath(d + 1);
                        }
                    }
                }
            }
        }

        false
    }
}
