//! Persistence of trie snapshots
//!
//! The core never performs I/O; this module is for callers that keep their
//! trie on disk between runs.

mod snapshot;

pub use snapshot::{Snapshot, DEFAULT_LEVEL};
