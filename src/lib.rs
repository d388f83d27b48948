//! # merkle_delta
//!
//! A content-addressed trie for fingerprinting a key/value set and finding the
//! keys that differ between two replicas without exchanging values.
//!
//! Each side builds a trie from its keys and the digests of their values,
//! ships the compact encoding, and diffs it against its own. Only the keys
//! come back; values are fetched out-of-band for just those keys.
//!
//! ## Core Concepts
//!
//! - **Digest**: 20-byte fingerprint of a value (and of a key, which picks its
//!   slot at every depth)
//! - **Leaf / Branch**: the two node kinds; branches fan out on one digest byte
//! - **Alteration**: a batch of sets and deletes applied atomically
//! - **Diff**: the set of keys whose presence or value differs
//!
//! ## Example
//!
//! ```
//! use merkle_delta::{Alteration, MerkleTrie};
//!
//! let ours = MerkleTrie::from_batch(&[
//!     Alteration::set("a", "v1"),
//!     Alteration::set("b", "v2"),
//! ])?;
//! let theirs = MerkleTrie::decode(&ours.alter(&[Alteration::set("b", "v3")])?.encode()?)?;
//!
//! let changed: Vec<_> = ours.diff(&theirs).into_iter().collect();
//! assert_eq!(changed, vec![b"b".to_vec()]);
//! # Ok::<(), merkle_delta::Error>(())
//! ```

pub mod codec;
pub mod model;
pub mod ops;
pub mod store;
pub mod trie;

mod error;

pub use codec::{decode, encode};
pub use error::{Error, Result};
pub use model::{Alteration, Digest, DIGEST_LEN};
pub use ops::{diff, Diff};
pub use store::Snapshot;
pub use trie::{all_keys, alter, verify, Branch, Leaf, MerkleTrie, Node, SharedTrie};

/// Snapshot format version
pub const VERSION: u32 = 1;

/// Magic bytes for snapshot file identification
pub const MAGIC: &[u8; 8] = b"MDELTA01";
