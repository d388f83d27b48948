//! Trie node types

use crate::model::{Digest, DIGEST_LEN};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Encoded bytes of a leaf before its key: kind (1) + digest (20) + key length (4)
pub const LEAF_OVERHEAD: usize = 1 + DIGEST_LEN + 4;

/// Encoded bytes of a branch before its children: kind (1) + digest (20) +
/// subtree size (4) + child count (2)
pub const BRANCH_OVERHEAD: usize = 1 + DIGEST_LEN + 4 + 2;

/// Maximum number of children a branch can hold (one per slot byte)
pub const MAX_CHILDREN: usize = 256;

/// Kind tag for nodes, shared by the wire format and the branch digest
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Branch,
}

impl NodeKind {
    pub fn as_byte(&self) -> u8 {
        match self {
            NodeKind::Leaf => 0,
            NodeKind::Branch => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(NodeKind::Leaf),
            1 => Some(NodeKind::Branch),
            _ => None,
        }
    }
}

/// A single user key and the digest of its value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    pub(crate) key: Vec<u8>,
    pub(crate) digest: Digest,
}

impl Leaf {
    pub fn new(key: impl Into<Vec<u8>>, digest: Digest) -> Self {
        Leaf {
            key: key.into(),
            digest,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Digest of the value stored under this key
    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Slot this leaf occupies in a branch at `depth`
    pub fn slot(&self, depth: usize) -> u8 {
        Digest::of(&self.key).slot(depth)
    }

    /// Bytes this leaf occupies in the canonical encoding
    pub fn encoded_size(&self) -> usize {
        LEAF_OVERHEAD + self.key.len()
    }
}

/// A fork in the trie
///
/// Children are keyed by the byte of `digest(key)` at this branch's depth.
/// Untouched children are shared between snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branch {
    pub(crate) children: BTreeMap<u8, Arc<Node>>,
    pub(crate) subtree_size: usize,
    pub(crate) digest: Digest,
}

impl Branch {
    /// Build a branch, computing its size and digest from `children`
    ///
    /// Callers must not pass an empty map.
    pub(crate) fn from_children(children: BTreeMap<u8, Arc<Node>>) -> Self {
        let subtree_size = Self::compute_size(&children);
        let digest = Self::compute_digest(&children);
        Branch {
            children,
            subtree_size,
            digest,
        }
    }

    /// Rebuild a branch exactly as it was transmitted
    pub(crate) fn from_parts(
        children: BTreeMap<u8, Arc<Node>>,
        subtree_size: usize,
        digest: Digest,
    ) -> Self {
        Branch {
            children,
            subtree_size,
            digest,
        }
    }

    pub fn children(&self) -> &BTreeMap<u8, Arc<Node>> {
        &self.children
    }

    pub fn child(&self, slot: u8) -> Option<&Node> {
        self.children.get(&slot).map(Arc::as_ref)
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Cached size of this subtree's canonical encoding
    pub fn subtree_size(&self) -> usize {
        self.subtree_size
    }

    pub(crate) fn compute_size(children: &BTreeMap<u8, Arc<Node>>) -> usize {
        BRANCH_OVERHEAD
            + children.len()
            + children.values().map(|c| c.encoded_size()).sum::<usize>()
    }

    /// Hash of the ascending `(slot, kind, child digest[, key])` sequence
    ///
    /// Leaf keys are folded in so that the digest covers every key beneath
    /// the branch, not just every value.
    pub(crate) fn compute_digest(children: &BTreeMap<u8, Arc<Node>>) -> Digest {
        let mut hasher = blake3::Hasher::new();
        for (slot, child) in children {
            hasher.update(&[*slot, child.kind().as_byte()]);
            hasher.update(child.digest().as_bytes());
            if let Node::Leaf(leaf) = child.as_ref() {
                hasher.update(&(leaf.key.len() as u64).to_be_bytes());
                hasher.update(&leaf.key);
            }
        }
        Digest::from_hasher(&hasher)
    }

    pub(crate) fn collect_keys(&self, out: &mut BTreeSet<Vec<u8>>) {
        for child in self.children.values() {
            child.collect_keys(out);
        }
    }

    /// Find the digest stored for `key`, following `key_digest` from `depth`
    pub(crate) fn find(&self, key: &[u8], key_digest: &Digest, depth: usize) -> Option<Digest> {
        if depth >= DIGEST_LEN {
            return None;
        }
        match self.child(key_digest.slot(depth))? {
            Node::Leaf(leaf) => (leaf.key == key).then_some(leaf.digest),
            Node::Branch(branch) => branch.find(key, key_digest, depth + 1),
        }
    }
}

/// A node in the merkle trie
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf(Leaf),
    Branch(Branch),
}

impl Node {
    /// Create a leaf node
    pub fn leaf(key: impl Into<Vec<u8>>, digest: Digest) -> Self {
        Node::Leaf(Leaf::new(key, digest))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Branch(_) => NodeKind::Branch,
        }
    }

    /// Value digest for a leaf, structural digest for a branch
    pub fn digest(&self) -> Digest {
        match self {
            Node::Leaf(leaf) => leaf.digest,
            Node::Branch(branch) => branch.digest,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Node::Branch(_))
    }

    /// Bytes this subtree occupies in the canonical encoding
    pub fn encoded_size(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.encoded_size(),
            Node::Branch(branch) => branch.subtree_size,
        }
    }

    /// Look up the value digest stored for `key`
    pub fn get(&self, key: &[u8]) -> Option<Digest> {
        match self {
            Node::Leaf(leaf) => (leaf.key == key).then_some(leaf.digest),
            Node::Branch(branch) => branch.find(key, &Digest::of(key), 0),
        }
    }

    /// All user keys reachable from this node
    pub fn keys(&self) -> BTreeSet<Vec<u8>> {
        let mut keys = BTreeSet::new();
        self.collect_keys(&mut keys);
        keys
    }

    pub(crate) fn collect_keys(&self, out: &mut BTreeSet<Vec<u8>>) {
        match self {
            Node::Leaf(leaf) => {
                out.insert(leaf.key.clone());
            }
            Node::Branch(branch) => branch.collect_keys(out),
        }
    }

    /// Number of leaves under this node
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Branch(branch) => branch.children.values().map(|c| c.leaf_count()).sum(),
        }
    }

    /// Number of levels from this node to its deepest leaf, counting both
    pub fn height(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Branch(branch) => {
                1 + branch
                    .children
                    .values()
                    .map(|c| c.height())
                    .max()
                    .unwrap_or(0)
            }
        }
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Node::Leaf(leaf)
    }
}

impl From<Branch> for Node {
    fn from(branch: Branch) -> Self {
        Node::Branch(branch)
    }
}

/// All user keys in an optional root
pub fn all_keys(root: Option<&Node>) -> BTreeSet<Vec<u8>> {
    root.map(Node::keys).unwrap_or_default()
}
