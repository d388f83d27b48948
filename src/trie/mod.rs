//! Merkle trie over key digests
//!
//! Keys are routed by successive bytes of their digest: a branch at depth `d`
//! holds each child under byte `d` of `digest(key)`. Leaves carry the digest of
//! their value, branches a digest over their children, so equal root digests
//! mean equal contents and unequal subtrees can be found without shipping
//! values.

mod alter;
mod node;
mod shared;
mod tree;
mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use alter::alter;
pub use node::{
    all_keys, Branch, Leaf, Node, NodeKind, BRANCH_OVERHEAD, LEAF_OVERHEAD, MAX_CHILDREN,
};
pub use shared::SharedTrie;
pub use tree::MerkleTrie;
pub use verify::verify;
