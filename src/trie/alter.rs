//! Batch alteration: insert, update and delete keys in one structural update
//!
//! Alterations never touch their input. Each call walks the paths the batch
//! touches, builds new nodes along them and shares every other subtree with
//! the previous root, so a failed batch leaves the caller's root intact.

use super::node::{Branch, Leaf, Node};
use crate::model::{Alteration, Digest, DIGEST_LEN};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// An alteration with its digests computed once up front
#[derive(Debug)]
pub(crate) struct Change<'a> {
    key: &'a [u8],
    key_digest: Digest,
    value: Option<Digest>,
}

impl<'a> From<&'a Alteration> for Change<'a> {
    fn from(alteration: &'a Alteration) -> Self {
        Change {
            key: &alteration.key,
            key_digest: alteration.key_digest(),
            value: alteration.value_digest(),
        }
    }
}

/// Apply `batch` to `root` and return the new root
///
/// Entries apply in order, so a later entry for the same key wins. `None` means
/// the resulting trie is empty.
#[instrument(level = "debug", skip_all, fields(batch = batch.len()))]
pub fn alter(root: Option<&Node>, batch: &[Alteration]) -> Result<Option<Node>> {
    let changes: Vec<Change<'_>> = batch.iter().map(Change::from).collect();
    let pending: Vec<&Change<'_>> = changes.iter().collect();
    let altered = alter_node(root, 0, &pending)?;
    debug!(
        root = ?altered.as_ref().map(Node::digest),
        "applied alteration batch"
    );
    Ok(altered)
}

pub(crate) fn alter_node(
    node: Option<&Node>,
    depth: usize,
    changes: &[&Change<'_>],
) -> Result<Option<Node>> {
    if changes.is_empty() {
        return Ok(node.cloned());
    }
    match node {
        None => alter_absent(depth, changes),
        Some(Node::Leaf(leaf)) => alter_leaf(leaf.clone(), depth, changes),
        Some(Node::Branch(branch)) => alter_branch(branch.children.clone(), depth, changes),
    }
}

fn alter_absent(depth: usize, changes: &[&Change<'_>]) -> Result<Option<Node>> {
    // deletes ahead of the first insert have nothing to remove
    let first_insert = changes
        .iter()
        .enumerate()
        .find_map(|(i, change)| change.value.map(|digest| (i, change, digest)));

    match first_insert {
        None => Ok(None),
        Some((i, change, digest)) => {
            let leaf = Leaf::new(change.key, digest);
            alter_leaf(leaf, depth, &changes[i + 1..])
        }
    }
}

fn alter_leaf(mut leaf: Leaf, depth: usize, changes: &[&Change<'_>]) -> Result<Option<Node>> {
    for (i, change) in changes.iter().enumerate() {
        if change.key == leaf.key.as_slice() {
            match change.value {
                Some(digest) => leaf.digest = digest,
                None => return alter_absent(depth, &changes[i + 1..]),
            }
        } else if change.value.is_some() {
            if depth >= DIGEST_LEN {
                return Err(Error::CollisionExhausted {
                    existing: leaf.key,
                    incoming: change.key.to_vec(),
                });
            }
            trace!(depth, "promoting leaf to branch");
            let mut children = BTreeMap::new();
            children.insert(leaf.slot(depth), Arc::new(Node::Leaf(leaf)));
            return alter_branch(children, depth, &changes[i..]);
        }
    }
    Ok(Some(Node::Leaf(leaf)))
}

fn alter_branch(
    mut children: BTreeMap<u8, Arc<Node>>,
    depth: usize,
    changes: &[&Change<'_>],
) -> Result<Option<Node>> {
    if depth >= DIGEST_LEN {
        return Err(Error::format(format!("branch nested below depth {DIGEST_LEN}")));
    }

    let mut groups: BTreeMap<u8, Vec<&Change<'_>>> = BTreeMap::new();
    for change in changes {
        groups
            .entry(change.key_digest.slot(depth))
            .or_default()
            .push(*change);
    }

    for (slot, group) in groups {
        let child = children.get(&slot).map(Arc::as_ref);
        match alter_node(child, depth + 1, &group)? {
            Some(node) => {
                children.insert(slot, Arc::new(node));
            }
            None => {
                children.remove(&slot);
            }
        }
    }

    Ok(finish_branch(children, depth))
}

/// Prune an empty branch and collapse one holding a single leaf
///
/// A leaf is valid at any depth along its digest path, so collapsing keeps the
/// trie's shape a function of its contents alone.
fn finish_branch(children: BTreeMap<u8, Arc<Node>>, depth: usize) -> Option<Node> {
    match children.len() {
        0 => {
            trace!(depth, "pruning empty branch");
            None
        }
        1 if !children.values().any(|child| child.is_branch()) => {
            trace!(depth, "collapsing single-leaf branch");
            children.into_values().next().map(Arc::unwrap_or_clone)
        }
        _ => Some(Node::Branch(Branch::from_children(children))),
    }
}
