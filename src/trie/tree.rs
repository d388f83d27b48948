//! Snapshot handle over an optional root

use super::{alter, verify, Node};
use crate::codec;
use crate::model::{Alteration, Digest};
use crate::ops::{diff, Diff};
use crate::Result;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::sync::Arc;

/// An immutable merkle trie snapshot
///
/// Cloning is cheap: the root is reference counted and altering a snapshot
/// shares every untouched subtree with the result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleTrie {
    root: Option<Arc<Node>>,
}

impl MerkleTrie {
    /// Create a new empty trie
    pub fn new() -> Self {
        MerkleTrie { root: None }
    }

    /// Wrap an existing root
    pub fn from_node(root: Option<Node>) -> Self {
        MerkleTrie {
            root: root.map(Arc::new),
        }
    }

    /// Build a trie from scratch
    pub fn from_batch(batch: &[Alteration]) -> Result<Self> {
        Self::new().alter(batch)
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    /// Get the root digest, `None` for an empty trie
    pub fn root_digest(&self) -> Option<Digest> {
        self.root().map(Node::digest)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.root().map_or(0, Node::leaf_count)
    }

    /// Apply a batch, returning the new snapshot and leaving this one as is
    pub fn alter(&self, batch: &[Alteration]) -> Result<Self> {
        if batch.is_empty() {
            return Ok(self.clone());
        }
        Ok(Self::from_node(alter(self.root(), batch)?))
    }

    /// Apply a batch in place; on error the trie is unchanged
    pub fn apply(&mut self, batch: &[Alteration]) -> Result<()> {
        *self = self.alter(batch)?;
        Ok(())
    }

    /// Get the value digest stored for a key
    pub fn get(&self, key: &[u8]) -> Option<Digest> {
        self.root()?.get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// All keys in the trie
    pub fn keys(&self) -> BTreeSet<Vec<u8>> {
        super::all_keys(self.root())
    }

    /// Keys that differ between this trie and `other`
    pub fn diff(&self, other: &MerkleTrie) -> Diff {
        diff(self.root(), other.root())
    }

    /// Canonical wire encoding
    pub fn encode(&self) -> Result<Bytes> {
        codec::encode(self.root())
    }

    /// Decode a wire encoding without checking its digests
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_node(codec::decode(bytes)?))
    }

    /// Decode a wire encoding and reject it unless every digest, size and
    /// slot checks out
    pub fn decode_verified(bytes: &[u8]) -> Result<Self> {
        let trie = Self::decode(bytes)?;
        trie.verify()?;
        Ok(trie)
    }

    pub fn verify(&self) -> Result<()> {
        verify(self.root())
    }
}
