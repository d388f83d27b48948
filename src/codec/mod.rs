//! Canonical binary encoding of a trie
//!
//! Depth-first pre-order, all integers big-endian:
//! ```text
//! Node          ::= kind (u8: 0 = leaf, 1 = branch) digest (20 bytes) payload
//! LeafPayload   ::= key_len (i32) key (key_len bytes)
//! BranchPayload ::= subtree_size (i32) child_count (u16) Child{child_count}
//! Child         ::= slot (u8) Node
//! ```
//!
//! An empty trie encodes to zero bytes. Children are written in ascending slot
//! order so equal tries produce equal bytes; the decoder accepts any order.
//! `subtree_size` is carried for readers that want to skip subtrees but the
//! decoder never relies on it.

use crate::model::{Digest, DIGEST_LEN};
use crate::trie::{Branch, Leaf, Node, NodeKind, MAX_CHILDREN};
use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Encode an optional root
pub fn encode(root: Option<&Node>) -> Result<Bytes> {
    let Some(root) = root else {
        return Ok(Bytes::new());
    };
    let mut buf = BytesMut::with_capacity(root.encoded_size());
    encode_node(root, &mut buf)?;
    trace!(bytes = buf.len(), "encoded trie");
    Ok(buf.freeze())
}

fn encode_node(node: &Node, buf: &mut BytesMut) -> Result<()> {
    buf.put_u8(node.kind().as_byte());
    buf.put_slice(node.digest().as_bytes());
    match node {
        Node::Leaf(leaf) => {
            buf.put_i32(to_i32(leaf.key.len(), "key length")?);
            buf.put_slice(&leaf.key);
        }
        Node::Branch(branch) => {
            buf.put_i32(to_i32(branch.subtree_size, "subtree size")?);
            // a branch holds at most one child per slot byte, so this fits
            buf.put_u16(branch.children.len() as u16);
            for (slot, child) in &branch.children {
                buf.put_u8(*slot);
                encode_node(child, buf)?;
            }
        }
    }
    Ok(())
}

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::TooLarge(format!("{what} {value} exceeds i32")))
}

/// Decode bytes produced by [`encode`]
///
/// The whole buffer must be consumed by exactly one root node.
pub fn decode(bytes: &[u8]) -> Result<Option<Node>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let mut buf = bytes;
    let root = decode_node(&mut buf, 0).inspect_err(|e| warn!(error = %e, "failed to decode trie"))?;
    if buf.has_remaining() {
        return Err(Error::format(format!(
            "{} trailing bytes after root node",
            buf.remaining()
        )));
    }
    Ok(Some(root))
}

fn decode_node(buf: &mut &[u8], depth: usize) -> Result<Node> {
    let flag = read_u8(buf, "node kind")?;
    let kind = NodeKind::from_byte(flag)
        .ok_or_else(|| Error::format(format!("invalid node kind {flag}")))?;
    let digest = read_digest(buf)?;

    match kind {
        NodeKind::Leaf => {
            let key_len = read_i32(buf, "key length")?;
            let key_len = usize::try_from(key_len)
                .map_err(|_| Error::format(format!("negative key length {key_len}")))?;
            ensure(buf, key_len, "key bytes")?;
            let key = buf[..key_len].to_vec();
            buf.advance(key_len);
            Ok(Node::Leaf(Leaf::new(key, digest)))
        }
        NodeKind::Branch => {
            if depth >= DIGEST_LEN {
                return Err(Error::format(format!(
                    "branch nested below depth {DIGEST_LEN}"
                )));
            }
            let subtree_size = read_i32(buf, "subtree size")?;
            let subtree_size = usize::try_from(subtree_size)
                .map_err(|_| Error::format(format!("negative subtree size {subtree_size}")))?;
            let count = read_u16(buf, "child count")? as usize;
            if count == 0 || count > MAX_CHILDREN {
                return Err(Error::format(format!("invalid child count {count}")));
            }

            let mut children = BTreeMap::new();
            for _ in 0..count {
                let slot = read_u8(buf, "slot byte")?;
                let child = decode_node(buf, depth + 1)?;
                if children.insert(slot, Arc::new(child)).is_some() {
                    return Err(Error::format(format!("duplicate slot {slot} in branch")));
                }
            }
            Ok(Node::Branch(Branch::from_parts(children, subtree_size, digest)))
        }
    }
}

fn ensure(buf: &&[u8], needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(Error::format(format!(
            "truncated input reading {what}: need {needed} bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}

fn read_u8(buf: &mut &[u8], what: &str) -> Result<u8> {
    ensure(buf, 1, what)?;
    Ok(buf.get_u8())
}

fn read_u16(buf: &mut &[u8], what: &str) -> Result<u16> {
    ensure(buf, 2, what)?;
    Ok(buf.get_u16())
}

fn read_i32(buf: &mut &[u8], what: &str) -> Result<i32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_i32())
}

fn read_digest(buf: &mut &[u8]) -> Result<Digest> {
    ensure(buf, DIGEST_LEN, "digest")?;
    let mut bytes = [0u8; DIGEST_LEN];
    buf.copy_to_slice(&mut bytes);
    Ok(Digest::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Alteration;
    use crate::trie::testing::{colliding_pair, distinct_slot_keys};
    use crate::trie::{alter, BRANCH_OVERHEAD, LEAF_OVERHEAD};

    fn build<K: AsRef<[u8]>>(entries: &[(K, &str)]) -> Option<Node> {
        let batch: Vec<_> = entries
            .iter()
            .map(|(k, v)| Alteration::set(k.as_ref(), *v))
            .collect();
        alter(None, &batch).unwrap()
    }

    #[test]
    fn test_empty_roundtrip() {
        assert!(encode(None).unwrap().is_empty());
        assert!(decode(&[]).unwrap().is_none());
    }

    #[test]
    fn test_leaf_layout() {
        let root = build(&[(b"ab", "v")]).unwrap();
        let bytes = encode(Some(&root)).unwrap();

        assert_eq!(bytes.len(), LEAF_OVERHEAD + 2);
        assert_eq!(bytes[0], 0);
        assert_eq!(&bytes[1..21], Digest::of(b"v").as_bytes());
        assert_eq!(&bytes[21..25], &[0, 0, 0, 2]);
        assert_eq!(&bytes[25..], b"ab");
        assert_eq!(decode(&bytes).unwrap(), Some(root));
    }

    #[test]
    fn test_branch_layout() {
        let keys = distinct_slot_keys(3);
        let root = build(&[(&keys[0], "v0"), (&keys[1], "v1"), (&keys[2], "v2")]).unwrap();
        let bytes = encode(Some(&root)).unwrap();

        // the cached size is exactly the encoded length
        assert_eq!(bytes.len(), root.encoded_size());
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..21], root.digest().as_bytes());
        let size = i32::from_be_bytes(bytes[21..25].try_into().unwrap());
        assert_eq!(size as usize, bytes.len());
        assert_eq!(&bytes[25..27], &[0, 3]);

        // first child carries the smallest slot byte
        let min_slot = keys.iter().map(|k| Digest::of(k).slot(0)).min().unwrap();
        assert_eq!(bytes[BRANCH_OVERHEAD], min_slot);
    }

    #[test]
    fn test_nested_roundtrip() {
        let (k1, k2) = colliding_pair(2);
        let keys = distinct_slot_keys(4);
        let root = build(&[
            (&k1, "v1"),
            (&k2, "v2"),
            (&keys[0], "a"),
            (&keys[1], "b"),
            (&keys[2], "c"),
        ])
        .unwrap();
        assert!(root.height() >= 4);

        let bytes = encode(Some(&root)).unwrap();
        let decoded = decode(&bytes).unwrap().unwrap();
        assert_eq!(decoded, root);
        assert_eq!(decoded.keys(), root.keys());
        assert_eq!(encode(Some(&decoded)).unwrap(), bytes);
    }

    #[test]
    fn test_decode_accepts_any_child_order() {
        let keys = distinct_slot_keys(2);
        let root = build(&[(&keys[0], "v0"), (&keys[1], "v1")]).unwrap();
        let Node::Branch(branch) = &root else {
            panic!("expected branch");
        };

        let mut buf = BytesMut::new();
        buf.put_u8(1);
        buf.put_slice(branch.digest().as_bytes());
        buf.put_i32(branch.subtree_size() as i32);
        buf.put_u16(2);
        for (slot, child) in branch.children().iter().rev() {
            buf.put_u8(*slot);
            encode_node(child, &mut buf).unwrap();
        }

        assert_eq!(decode(&buf).unwrap(), Some(root));
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let keys = distinct_slot_keys(2);
        let root = build(&[(&keys[0], "v0"), (&keys[1], "v1")]).unwrap();
        let bytes = encode(Some(&root)).unwrap();
        for len in 1..bytes.len() {
            let err = decode(&bytes[..len]).unwrap_err();
            assert!(matches!(err, Error::Format(_)), "len {len}: {err}");
        }
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let root = build(&[(b"a", "v")]).unwrap();
        let mut bytes = encode(Some(&root)).unwrap().to_vec();
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_decode_rejects_bad_kind() {
        let root = build(&[(b"a", "v")]).unwrap();
        let mut bytes = encode(Some(&root)).unwrap().to_vec();
        bytes[0] = 2;
        assert!(matches!(decode(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_decode_rejects_negative_key_length() {
        let mut buf = BytesMut::new();
        buf.put_u8(0);
        buf.put_slice(&[0u8; DIGEST_LEN]);
        buf.put_i32(-1);
        assert!(matches!(decode(&buf), Err(Error::Format(_))));
    }

    #[test]
    fn test_decode_rejects_bad_child_counts() {
        for count in [0u16, 257] {
            let mut buf = BytesMut::new();
            buf.put_u8(1);
            buf.put_slice(&[0u8; DIGEST_LEN]);
            buf.put_i32(BRANCH_OVERHEAD as i32);
            buf.put_u16(count);
            assert!(matches!(decode(&buf), Err(Error::Format(_))), "count {count}");
        }

        // claims more children than the buffer holds
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        buf.put_slice(&[0u8; DIGEST_LEN]);
        buf.put_i32(0);
        buf.put_u16(3);
        buf.put_u8(7);
        buf.put_u8(0);
        buf.put_slice(&[0u8; DIGEST_LEN]);
        buf.put_i32(1);
        buf.put_u8(b'k');
        assert!(matches!(decode(&buf), Err(Error::Format(_))));
    }

    #[test]
    fn test_decode_rejects_duplicate_slots() {
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        buf.put_slice(&[0u8; DIGEST_LEN]);
        buf.put_i32(0);
        buf.put_u16(2);
        for key in [b"x", b"y"] {
            buf.put_u8(9);
            buf.put_u8(0);
            buf.put_slice(&[0u8; DIGEST_LEN]);
            buf.put_i32(1);
            buf.put_slice(key);
        }
        assert!(matches!(decode(&buf), Err(Error::Format(_))));
    }

    #[test]
    fn test_decode_rejects_excessive_nesting() {
        let mut buf = BytesMut::new();
        for _ in 0..=DIGEST_LEN {
            buf.put_u8(1);
            buf.put_slice(&[0u8; DIGEST_LEN]);
            buf.put_i32(0);
            buf.put_u16(1);
            buf.put_u8(0);
        }
        buf.put_u8(0);
        buf.put_slice(&[0u8; DIGEST_LEN]);
        buf.put_i32(0);
        assert!(matches!(decode(&buf), Err(Error::Format(_))));
    }
}
