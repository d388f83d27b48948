//! Error types for merkle_delta

use thiserror::Error;

/// Result type alias for merkle_delta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in merkle_delta operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed trie encoding: {0}")]
    Format(String),

    /// Two distinct keys whose digests agree on every byte cannot be
    /// separated by slot selection.
    #[error(
        "Digest collision exhausted all depths between keys {} and {}",
        hex::encode(existing),
        hex::encode(incoming)
    )]
    CollisionExhausted { existing: Vec<u8>, incoming: Vec<u8> },

    #[error("Trie too large to encode: {0}")]
    TooLarge(String),

    #[error("Trie verification failed: {0}")]
    Verification(String),

    #[error("Invalid snapshot file: {0}")]
    InvalidFile(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    pub(crate) fn verification(msg: impl Into<String>) -> Self {
        Error::Verification(msg.into())
    }
}
