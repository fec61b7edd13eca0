//! Cooperative cancellation
//!
//! A cloneable flag shared between the controller and the scan worker. The
//! worker checks it between directories and between files. Nothing in flight
//! (a hash, a move) is interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop request for a scan
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag before a new run
    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
