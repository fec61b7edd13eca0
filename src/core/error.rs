//! Error types for the data librarian
//!
//! Errors fall into two groups. Per-file errors (an unreadable file, a failed
//! move) are logged to the run log and the scan moves on. Everything else is
//! fatal for the current run and ends the job in the `Failed` state.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::config::ConfigError;

/// Main error type for the data librarian
#[derive(Error, Debug)]
pub enum LibrarianError {
    /// The holding (quarantine) directory could not be created
    #[error("Could not create holding directory '{}': {source}", path.display())]
    HoldingDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The run log could not be opened
    #[error("Failed to open log file '{}': {source}", path.display())]
    LogOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A write to the run log failed
    #[error("Failed to write to log file '{}': {source}", path.display())]
    LogWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file could not be read while hashing
    #[error("Unreadable file '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A duplicate could not be moved into the holding directory
    #[error("Failed to move '{}' to '{}': {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// A scan is already running
    #[error("A scan is already running")]
    AlreadyRunning,

    /// No scan is running
    #[error("No scan is running")]
    NotRunning,

    /// The scan worker thread panicked
    #[error("Scan worker panicked: {0}")]
    WorkerPanicked(String),

    /// Configuration could not be loaded, updated or saved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// General I/O error
    #[error("IO error: {0}")]
    IoError(String),
}

impl LibrarianError {
    /// Whether the run can log this error and continue with the next file
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LibrarianError::Unreadable { .. } | LibrarianError::Move { .. }
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LibrarianError>;

impl From<std::io::Error> for LibrarianError {
    fn from(err: std::io::Error) -> Self {
        LibrarianError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_per_file_errors_are_recoverable() {
        let unreadable = LibrarianError::Unreadable {
            path: PathBuf::from("a.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let moved = LibrarianError::Move {
            from: PathBuf::from("b.txt"),
            to: PathBuf::from("bin/b.txt"),
            source: io::Error::new(io::ErrorKind::Other, "busy"),
        };

        assert!(unreadable.is_recoverable());
        assert!(moved.is_recoverable());
    }

    #[test]
    fn test_setup_errors_are_fatal() {
        let holding = LibrarianError::HoldingDir {
            path: PathBuf::from("bin"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let log = LibrarianError::LogOpen {
            path: PathBuf::from("bin/log.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };

        assert!(!holding.is_recoverable());
        assert!(!log.is_recoverable());
        assert!(!LibrarianError::AlreadyRunning.is_recoverable());
    }

    #[test]
    fn test_error_messages_name_the_path() {
        let err = LibrarianError::Unreadable {
            path: PathBuf::from("photos/a.jpg"),
            source: io::Error::new(io::ErrorKind::NotFound, "vanished"),
        };

        let message = err.to_string();
        assert!(message.contains("photos/a.jpg"));
        assert!(message.contains("vanished"));
    }
}
