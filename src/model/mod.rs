//! Core data model types for merkle_delta

mod alteration;
mod digest;

pub use alteration::Alteration;
pub use digest::{Digest, DIGEST_LEN};
