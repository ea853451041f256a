//! Shared helpers for unit tests

use crate::data_source::DataSource;
use crate::encoder::Sha3ValueEncoder;
use crate::hash::{sha3_256, Hash256, HashBuilder};
use crate::node::TreeNode;
use crate::proof::Proof;
use std::collections::{BTreeMap, BTreeSet};

/// u32 keys, string values hashed with SHA3-256
pub type TestEncoder = Sha3ValueEncoder<u32, &'static str>;

pub fn value_hash(value: &str) -> Hash256 {
    sha3_256(value.as_bytes())
}

/// Expected leaf hash from raw encoded path bytes
pub fn leaf_hash(encoded_path: &[u8], value: &str) -> Hash256 {
    let mut builder = HashBuilder::new();
    builder.update(encoded_path).update(value_hash(value));
    builder.finalize()
}

/// Expected branch hash from raw encoded path bytes and `(index, hash)` links
pub fn branch_hash(encoded_path: &[u8], links: &[(u8, Hash256)]) -> Hash256 {
    let mut all = [Hash256::ZERO; 16];
    for (index, hash) in links {
        all[*index as usize] = *hash;
    }

    let mut builder = HashBuilder::new();
    builder.update(encoded_path);
    for link in &all {
        builder.update(link);
    }
    builder.finalize()
}

/// Every hash reachable from `root` through `source`
pub fn reachable_hashes(source: &impl DataSource, root: &Hash256) -> BTreeSet<Hash256> {
    let mut seen = BTreeSet::new();
    let mut pending = vec![*root];
    while let Some(hash) = pending.pop() {
        if hash.is_zero() || !seen.insert(hash) {
            continue;
        }

        let node = source
            .get(&hash)
            .unwrap()
            .unwrap_or_else(|| panic!("node {} reachable but not stored", hash));
        if let TreeNode::Branch(branch) = node {
            pending.extend(branch.link_indexes().map(|i| branch.link(i)));
        }
    }
    seen
}

/// Assert exactly the named hashes are reachable from `root`
pub fn assert_reachable(source: &impl DataSource, root: &Hash256, expected: &[(&str, Hash256)]) {
    let names: BTreeMap<Hash256, &str> = expected.iter().map(|(name, hash)| (*hash, *name)).collect();
    let reachable = reachable_hashes(source, root);

    for (name, hash) in expected {
        assert!(reachable.contains(hash), "{} ({}) is not reachable", name, hash);
    }
    for hash in &reachable {
        assert!(names.contains_key(hash), "unexpected node {} is reachable", hash);
    }
    assert_eq!(reachable.len(), expected.len());
}

/// Assert a proof is an inclusion proof for `value` that verifies against `root`
pub fn assert_inclusion(proof: &Proof, root: &Hash256, value: &str, num_nodes: usize) {
    assert_eq!(proof.value, Some(value_hash(value)));
    assert_eq!(proof.nodes.len(), num_nodes);
    assert!(proof.nodes.last().is_some_and(|node| node.is_leaf()));
    assert!(proof.verify(root), "inclusion proof does not verify");
}

/// Assert a proof is an exclusion proof with the given node hashes
pub fn assert_exclusion(proof: &Proof, root: &Hash256, expected_nodes: &[Hash256]) {
    assert_eq!(proof.value, None);
    let hashes: Vec<Hash256> = proof.nodes.iter().map(|node| node.hash()).collect();
    assert_eq!(hashes, expected_nodes);
    assert!(proof.verify(root), "exclusion proof does not verify");
}

/// All orderings of `items`
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }

    let mut all = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let first = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first.clone());
            all.push(tail);
        }
    }
    all
}
