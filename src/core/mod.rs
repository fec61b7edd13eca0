//! Core functionality module
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and per-scan snapshots
//! - `error` - Error types and result aliases

pub mod config;
pub mod error;
