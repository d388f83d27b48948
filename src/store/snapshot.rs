//! Snapshot files: a header followed by the zstd-compressed wire encoding
//!
//! File format:
//! ```text
//! [HEADER: 16 bytes]
//!   - magic: 8 bytes ("MDELTA01")
//!   - version: 4 bytes (u32 LE)
//!   - flags: 4 bytes (u32 LE, reserved)
//!
//! [BODY: variable]
//!   - zstd frame holding the canonical trie encoding
//! ```

use crate::trie::MerkleTrie;
use crate::{Error, Result, MAGIC, VERSION};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::debug;

const HEADER_SIZE: usize = 16;

/// Default zstd compression level
pub const DEFAULT_LEVEL: i32 = 3;

/// Serializes tries into self-identifying, compressed snapshots
#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    level: i32,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            level: DEFAULT_LEVEL,
        }
    }
}

impl Snapshot {
    /// Use a specific zstd compression level
    pub fn with_level(level: i32) -> Self {
        Snapshot { level }
    }

    pub fn to_bytes(&self, trie: &MerkleTrie) -> Result<Vec<u8>> {
        let encoded = trie.encode()?;
        let mut output = Vec::with_capacity(HEADER_SIZE + encoded.len() / 2);
        output.extend_from_slice(MAGIC);
        output.extend_from_slice(&VERSION.to_le_bytes());
        output.extend_from_slice(&0u32.to_le_bytes());
        output.extend(zstd::encode_all(encoded.as_ref(), self.level)?);
        Ok(output)
    }

    /// Parse a snapshot, verifying the trie it holds
    pub fn from_bytes(data: &[u8]) -> Result<MerkleTrie> {
        MerkleTrie::decode_verified(&Self::body(data)?)
    }

    /// Parse a snapshot without checking the digests of the trie it holds
    ///
    /// The header and wire encoding must still be well formed.
    pub fn from_bytes_unverified(data: &[u8]) -> Result<MerkleTrie> {
        MerkleTrie::decode(&Self::body(data)?)
    }

    /// Check the header and decompress the wire encoding
    fn body(data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < HEADER_SIZE {
            return Err(Error::InvalidFile(format!(
                "{} bytes is shorter than the header",
                data.len()
            )));
        }
        if &data[0..8] != MAGIC {
            return Err(Error::InvalidFile("Invalid magic bytes".into()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&data[8..12]);
        let version = u32::from_le_bytes(version);
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        Ok(zstd::decode_all(&data[HEADER_SIZE..])?)
    }

    /// Write a snapshot file, replacing it atomically
    pub fn save(&self, path: impl AsRef<Path>, trie: &MerkleTrie) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes(trie)?;

        let tmp = path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;

        debug!(path = %path.display(), bytes = bytes.len(), "saved trie snapshot");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<MerkleTrie> {
        let path = path.as_ref();
        let trie = Self::from_bytes(&fs::read(path)?)?;
        debug!(path = %path.display(), keys = trie.len(), "loaded trie snapshot");
        Ok(trie)
    }

    /// Load a snapshot for inspection, leaving verification to the caller
    pub fn load_unverified(path: impl AsRef<Path>) -> Result<MerkleTrie> {
        let path = path.as_ref();
        let trie = Self::from_bytes_unverified(&fs::read(path)?)?;
        debug!(path = %path.display(), keys = trie.len(), "loaded unverified trie snapshot");
        Ok(trie)
    }
}
