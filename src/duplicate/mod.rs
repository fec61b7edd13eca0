//! Duplicate detection module
//!
//! Exact-match duplicate detection using SHA256 content digests.
//!
//! # Submodules
//!
//! - `hasher` - Streaming file hashing
//! - `resolver` - Run-scoped digest index and duplicate events

pub mod hasher;
pub mod resolver;

pub use hasher::{compute_file_hash, hash_to_hex, Sha256Hash};
pub use resolver::{DigestIndex, DuplicateEvent, Resolution};
