//! Structural comparison of two tries

use crate::model::Digest;
use crate::trie::{Branch, Leaf, Node};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// The keys whose presence or value digest differs between two tries
///
/// A diff is direction-agnostic: it names keys, not whether they were added,
/// removed or modified. Callers fetch whatever they need for those keys
/// out-of-band.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff {
    keys: BTreeSet<Vec<u8>>,
}

impl Diff {
    pub fn new(keys: BTreeSet<Vec<u8>>) -> Self {
        Diff { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> &BTreeSet<Vec<u8>> {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.keys.iter().map(Vec::as_slice)
    }

    /// Keys rendered as UTF-8, replacing invalid sequences
    pub fn to_strings(&self) -> Vec<String> {
        self.iter()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .collect()
    }

    pub fn into_keys(self) -> BTreeSet<Vec<u8>> {
        self.keys
    }
}

impl IntoIterator for Diff {
    type Item = Vec<u8>;
    type IntoIter = std::collections::btree_set::IntoIter<Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

/// Compute the keys that differ between two roots
#[instrument(level = "debug", skip_all)]
pub fn diff(a: Option<&Node>, b: Option<&Node>) -> Diff {
    let mut keys = BTreeSet::new();
    match (a, b) {
        (None, None) => {}
        (Some(node), None) | (None, Some(node)) => node.collect_keys(&mut keys),
        (Some(a), Some(b)) => diff_nodes(a, b, &mut keys),
    }
    debug!(differing = keys.len(), "computed trie diff");
    Diff::new(keys)
}

fn diff_nodes(a: &Node, b: &Node, out: &mut BTreeSet<Vec<u8>>) {
    match (a, b) {
        (Node::Leaf(a), Node::Leaf(b)) => diff_leaves(a, b, out),
        (Node::Leaf(leaf), Node::Branch(branch)) | (Node::Branch(branch), Node::Leaf(leaf)) => {
            diff_leaf_branch(leaf, branch, out)
        }
        (Node::Branch(a), Node::Branch(b)) => diff_branches(a, b, out),
    }
}

fn diff_leaves(a: &Leaf, b: &Leaf, out: &mut BTreeSet<Vec<u8>>) {
    if a.key == b.key {
        if a.digest != b.digest {
            out.insert(a.key.clone());
        }
    } else {
        out.insert(a.key.clone());
        out.insert(b.key.clone());
    }
}

/// Every key under the branch differs from a lone leaf, except the leaf's own
/// key when the branch holds it with the same value.
fn diff_leaf_branch(leaf: &Leaf, branch: &Branch, out: &mut BTreeSet<Vec<u8>>) {
    let mut branch_keys = BTreeSet::new();
    let mut found = None;
    for child in branch.children().values() {
        scan(child, &leaf.key, &mut branch_keys, &mut found);
    }
    if found == Some(leaf.digest) {
        branch_keys.remove(&leaf.key);
    } else {
        branch_keys.insert(leaf.key.clone());
    }
    out.append(&mut branch_keys);
}

/// Collect every key under `node`, recording the digest of the first leaf
/// holding `key` in slot order. Slot placement is not trusted here, so a leaf
/// filed under the wrong slot is still found.
fn scan(node: &Node, key: &[u8], keys: &mut BTreeSet<Vec<u8>>, found: &mut Option<Digest>) {
    match node {
        Node::Leaf(leaf) => {
            if found.is_none() && leaf.key == key {
                *found = Some(leaf.digest);
            }
            keys.insert(leaf.key.clone());
        }
        Node::Branch(branch) => {
            for child in branch.children().values() {
                scan(child, key, keys, found);
            }
        }
    }
}

fn diff_branches(a: &Branch, b: &Branch, out: &mut BTreeSet<Vec<u8>>) {
    if a.digest == b.digest {
        return;
    }
    for (slot, a_child) in &a.children {
        match b.children.get(slot) {
            Some(b_child) => diff_nodes(a_child, b_child, out),
            None => a_child.collect_keys(out),
        }
    }
    for (slot, b_child) in &b.children {
        if !a.children.contains_key(slot) {
            b_child.collect_keys(out);
        }
    }
}
