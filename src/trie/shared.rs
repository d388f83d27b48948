//! A trie shared between one writer at a time and any number of readers

use super::MerkleTrie;
use crate::model::Alteration;
use crate::Result;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

/// Holds the current snapshot of a trie that several threads observe
///
/// Writers are serialized; a reader takes a snapshot and keeps it for as long
/// as it likes without blocking later writes.
#[derive(Debug, Default)]
pub struct SharedTrie {
    current: RwLock<MerkleTrie>,
    /// Serializes writers so each batch applies on top of the previous one
    writer: Mutex<()>,
}

impl SharedTrie {
    pub fn new(trie: MerkleTrie) -> Self {
        SharedTrie {
            current: RwLock::new(trie),
            writer: Mutex::new(()),
        }
    }

    /// Take the current snapshot
    pub fn snapshot(&self) -> MerkleTrie {
        self.current.read().clone()
    }

    /// Apply a batch on top of the current snapshot and publish the result
    ///
    /// Readers keep seeing the previous snapshot while the batch is computed.
    pub fn apply(&self, batch: &[Alteration]) -> Result<MerkleTrie> {
        let _writer = self.writer.lock();
        let next = self.snapshot().alter(batch)?;
        *self.current.write() = next.clone();
        debug!(keys = next.len(), "published trie snapshot");
        Ok(next)
    }

    /// Replace the current snapshot, e.g. with one decoded from a peer
    pub fn replace(&self, trie: MerkleTrie) {
        let _writer = self.writer.lock();
        *self.current.write() = trie;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_snapshot_survives_writes() {
        let shared = SharedTrie::default();
        shared.apply(&[Alteration::set("a", "1")]).unwrap();
        let before = shared.snapshot();

        shared.apply(&[Alteration::set("b", "2")]).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(shared.snapshot().len(), 2);
    }

    #[test]
    fn test_concurrent_writers_all_land() {
        let shared = Arc::new(SharedTrie::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for i in 0..25 {
                        shared
                            .apply(&[Alteration::set(format!("t{t}-k{i}"), "v")])
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shared.snapshot().len(), 200);
    }

    #[test]
    fn test_replace_publishes_new_snapshot() {
        let shared = SharedTrie::new(MerkleTrie::from_batch(&[Alteration::set("a", "1")]).unwrap());
        shared.replace(MerkleTrie::new());
        assert!(shared.snapshot().is_empty());
    }
}
