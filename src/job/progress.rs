//! Progress tracking
//!
//! Counters are written only by the scan worker and read by any number of
//! pollers. Each counter is an `AtomicU64`, so reads never block the worker
//! and never observe a torn value.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Called by the worker after each checked file
pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Progress at one point of a run, passed to a [`ProgressCallback`]
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Files checked so far
    pub checked: u64,
    /// Files counted in the first pass
    pub total: u64,
    /// File that was just checked
    pub current_file: PathBuf,
}

/// Thread-safe progress counters for the current run
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total_files: AtomicU64,
    checked_files: AtomicU64,
    duplicates_found: AtomicU64,
    files_moved: AtomicU64,
    errors: AtomicU64,
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the tracker for a new run
    pub fn reset(&self) {
        self.total_files.store(0, Ordering::SeqCst);
        self.checked_files.store(0, Ordering::SeqCst);
        self.duplicates_found.store(0, Ordering::SeqCst);
        self.files_moved.store(0, Ordering::SeqCst);
        self.errors.store(0, Ordering::SeqCst);
    }

    /// Set the total found by the counting pass
    pub fn set_total(&self, files: u64) {
        self.total_files.store(files, Ordering::SeqCst);
    }

    /// Record a checked file, returning the new count
    pub fn record_checked(&self) -> u64 {
        self.checked_files.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a duplicate found
    pub fn record_duplicate(&self) {
        self.duplicates_found.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a duplicate moved into the holding directory
    pub fn record_moved(&self) {
        self.files_moved.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a per-file error
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn total(&self) -> u64 {
        self.total_files.load(Ordering::SeqCst)
    }

    pub fn checked(&self) -> u64 {
        self.checked_files.load(Ordering::SeqCst)
    }

    pub fn moved(&self) -> u64 {
        self.files_moved.load(Ordering::SeqCst)
    }

    /// Get current stats as a snapshot
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total_files: self.total(),
            checked_files: self.checked(),
            duplicates_found: self.duplicates_found.load(Ordering::SeqCst),
            files_moved: self.moved(),
            errors: self.errors.load(Ordering::SeqCst),
        }
    }
}

/// Snapshot of current progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total_files: u64,
    pub checked_files: u64,
    pub duplicates_found: u64,
    pub files_moved: u64,
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_tracker_basic() {
        let tracker = ProgressTracker::new();
        tracker.set_total(10);

        assert_eq!(tracker.record_checked(), 1);
        assert_eq!(tracker.record_checked(), 2);
        tracker.record_duplicate();
        tracker.record_moved();
        tracker.record_error();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total_files, 10);
        assert_eq!(snapshot.checked_files, 2);
        assert_eq!(snapshot.duplicates_found, 1);
        assert_eq!(snapshot.files_moved, 1);
        assert_eq!(snapshot.errors, 1);
    }

    #[test]
    fn test_progress_tracker_reset() {
        let tracker = ProgressTracker::new();
        tracker.set_total(3);
        tracker.record_checked();
        tracker.record_moved();

        tracker.reset();
        assert_eq!(tracker.snapshot(), ProgressSnapshot::default());
    }

    #[test]
    fn test_concurrent_readers_see_monotonic_counts() {
        let tracker = Arc::new(ProgressTracker::new());
        tracker.set_total(10_000);

        let reader = {
            let tracker = Arc::clone(&tracker);
            std::thread::spawn(move || {
                let mut last = 0;
                for _ in 0..1_000 {
                    let now = tracker.checked();
                    assert!(now >= last);
                    assert!(now <= 10_000);
                    last = now;
                }
            })
        };

        for _ in 0..10_000 {
            tracker.record_checked();
        }
        reader.join().unwrap();
        assert_eq!(tracker.checked(), 10_000);
    }
}
