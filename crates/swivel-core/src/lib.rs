//! Low-level plumbing shared across the swivel crates.
//!
//! Provides the atomic-write / optional-read pair every persisted document
//! goes through, plus the Unix-time helper used for staging-file names.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::{read_text_optional, write_text_atomic};
pub use time_utils::current_unix_timestamp;
