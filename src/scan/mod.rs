//! The scan pipeline: walk, hash, resolve, quarantine, log.

pub mod mover;
pub mod run_log;
pub mod runner;
pub mod walker;

pub use mover::{sanitize_file_name, MoveOutcome, Quarantine};
pub use run_log::{LogEntry, RunLog};
pub use runner::{RunOutcome, RunReport, ScanRun};
pub use walker::{DirectoryWalker, ExclusionRules};
