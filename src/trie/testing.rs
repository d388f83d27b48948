//! Key fixtures for tests that depend on digest layout

use crate::model::Digest;
use std::collections::HashMap;

/// `n` keys whose digests all differ in their first byte
pub(crate) fn distinct_slot_keys(n: usize) -> Vec<Vec<u8>> {
    assert!(n <= 256);
    let mut seen = [false; 256];
    let mut keys = Vec::with_capacity(n);
    let mut i = 0u64;
    while keys.len() < n {
        let key = format!("key-{i}").into_bytes();
        let slot = Digest::of(&key).slot(0) as usize;
        if !seen[slot] {
            seen[slot] = true;
            keys.push(key);
        }
        i += 1;
    }
    keys
}

/// Two keys whose digests agree on the first `shared` bytes and differ on the next
pub(crate) fn colliding_pair(shared: usize) -> (Vec<u8>, Vec<u8>) {
    assert!(shared <= 3, "search space grows by 256x per byte");
    let mut by_prefix: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    for i in 0u64.. {
        let key = format!("collide-{i}").into_bytes();
        let digest = Digest::of(&key);
        let prefix = digest.as_bytes()[..shared].to_vec();
        if let Some(other) = by_prefix.get(&prefix) {
            if Digest::of(other).slot(shared) != digest.slot(shared) {
                return (other.clone(), key);
            }
            continue;
        }
        by_prefix.insert(prefix, key);
    }
    unreachable!()
}
