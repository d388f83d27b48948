//! Structural verification of a trie received from elsewhere
//!
//! Decoding trusts the digests and sizes it reads. `verify` recomputes them and
//! checks that every leaf sits on its own digest path, so a peer's trie can be
//! rejected before it is diffed against local state.

use super::node::{Branch, Node, MAX_CHILDREN};
use crate::model::{Digest, DIGEST_LEN};
use crate::{Error, Result};

/// Check every invariant the mutator maintains
pub fn verify(root: Option<&Node>) -> Result<()> {
    match root {
        None => Ok(()),
        Some(node) => verify_node(node, &mut Vec::with_capacity(DIGEST_LEN)),
    }
}

/// `path` holds the slot bytes leading to `node`; its length is the depth.
fn verify_node(node: &Node, path: &mut Vec<u8>) -> Result<()> {
    match node {
        Node::Leaf(leaf) => {
            let key_digest = Digest::of(&leaf.key);
            if key_digest.as_bytes()[..path.len()] != path[..] {
                return Err(Error::verification(format!(
                    "key {} is not on slot path {}",
                    hex::encode(&leaf.key),
                    hex::encode(&path[..])
                )));
            }
            Ok(())
        }
        Node::Branch(branch) => verify_branch(branch, path),
    }
}

fn verify_branch(branch: &Branch, path: &mut Vec<u8>) -> Result<()> {
    let depth = path.len();
    if depth >= DIGEST_LEN {
        return Err(Error::verification(format!("branch at depth {depth}")));
    }
    let count = branch.children.len();
    if count == 0 || count > MAX_CHILDREN {
        return Err(Error::verification(format!(
            "branch at depth {depth} has {count} children"
        )));
    }
    if count == 1 && !branch.children.values().any(|c| c.is_branch()) {
        return Err(Error::verification(format!(
            "branch at depth {depth} wraps a single leaf"
        )));
    }

    for (slot, child) in &branch.children {
        path.push(*slot);
        verify_node(child, path)?;
        path.pop();
    }

    let size = Branch::compute_size(&branch.children);
    if size != branch.subtree_size {
        return Err(Error::verification(format!(
            "branch at depth {depth} records size {} but encodes to {size}",
            branch.subtree_size
        )));
    }
    let digest = Branch::compute_digest(&branch.children);
    if digest != branch.digest {
        return Err(Error::verification(format!(
            "branch at depth {depth} records digest {} but hashes to {digest}",
            branch.digest
        )));
    }
    Ok(())
}
