//! Operations across tries

mod diff;

pub use diff::{diff, Diff};
