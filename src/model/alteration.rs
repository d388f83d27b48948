//! Alteration - one pending change to a trie

use super::Digest;

/// A single key change applied by [`alter`](crate::trie::alter)
///
/// A `value` of `None` removes the key. Alterations are idempotent: removing a
/// key that does not exist, or setting a key to its current value, leaves the
/// trie unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alteration {
    /// Caller-supplied identifier
    pub key: Vec<u8>,
    /// Opaque value; only its digest is kept
    pub value: Option<Vec<u8>>,
}

impl Alteration {
    /// Set `key` to `value`
    pub fn set(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Alteration {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Remove `key`
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Alteration {
            key: key.into(),
            value: None,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }

    /// Digest of the key, which picks the slot at every depth
    pub fn key_digest(&self) -> Digest {
        Digest::of(&self.key)
    }

    /// Digest of the value, if this is not a delete
    pub fn value_digest(&self) -> Option<Digest> {
        self.value.as_deref().map(Digest::of)
    }
}

impl<K: Into<Vec<u8>>, V: Into<Vec<u8>>> From<(K, Option<V>)> for Alteration {
    fn from((key, value): (K, Option<V>)) -> Self {
        Alteration {
            key: key.into(),
            value: value.map(Into::into),
        }
    }
}
