//! Run-scoped duplicate resolution
//!
//! The first path seen with a given digest is the original for the rest of
//! the run. Walk order is the only precedence rule: there is no tie-break on
//! timestamps, depth or size.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::hasher::Sha256Hash;

/// Outcome of resolving one file against the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// First file with this digest; it is now the original
    FirstSeen,
    /// Same content as an earlier file
    DuplicateOf(PathBuf),
}

/// Digest -> first path seen, for one run.
///
/// Entries are only ever inserted. The index is dropped with the run.
#[derive(Debug, Default)]
pub struct DigestIndex {
    originals: HashMap<Sha256Hash, PathBuf>,
    duplicates_found: usize,
}

impl DigestIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `path` by its digest, recording it if it is the first.
    pub fn resolve(&mut self, digest: Sha256Hash, path: &Path) -> Resolution {
        match self.originals.get(&digest) {
            Some(original) => {
                self.duplicates_found += 1;
                Resolution::DuplicateOf(original.clone())
            }
            None => {
                self.originals.insert(digest, path.to_path_buf());
                Resolution::FirstSeen
            }
        }
    }

    /// Number of distinct digests seen
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Number of files classified as duplicates so far
    pub fn duplicates_found(&self) -> usize {
        self.duplicates_found
    }
}

/// A duplicate found during a run. Fields are never changed in place.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateEvent {
    /// The first file seen with this content
    pub original: PathBuf,
    /// The later file with the same content
    pub duplicate: PathBuf,
    /// Where the duplicate goes in the holding directory
    pub destination: PathBuf,
    /// When the duplicate was detected
    pub detected_at: DateTime<Local>,
}

impl DuplicateEvent {
    pub fn new(original: PathBuf, duplicate: PathBuf, destination: PathBuf) -> Self {
        Self {
            original,
            duplicate,
            destination,
            detected_at: Local::now(),
        }
    }

    /// Same event, with the destination the mover actually used
    pub fn with_destination(self, destination: PathBuf) -> Self {
        Self {
            destination,
            ..self
        }
    }

    /// Base name of the original
    pub fn original_name(&self) -> String {
        file_name_of(&self.original)
    }

    /// Base name of the duplicate
    pub fn duplicate_name(&self) -> String {
        file_name_of(&self.duplicate)
    }

    /// Base name of the destination
    pub fn destination_name(&self) -> String {
        file_name_of(&self.destination)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicate::hasher::compute_data_hash;

    #[test]
    fn test_first_seen_then_duplicate() {
        let mut index = DigestIndex::new();
        let digest = compute_data_hash(b"same bytes");

        assert_eq!(
            index.resolve(digest, Path::new("/root/a.txt")),
            Resolution::FirstSeen
        );
        assert_eq!(
            index.resolve(digest, Path::new("/root/b.txt")),
            Resolution::DuplicateOf(PathBuf::from("/root/a.txt"))
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.duplicates_found(), 1);
    }

    #[test]
    fn test_original_never_replaced() {
        let mut index = DigestIndex::new();
        let digest = compute_data_hash(b"shared content");

        index.resolve(digest, Path::new("first.jpg"));
        for i in 0..5 {
            let path = PathBuf::from(format!("copy{}.jpg", i));
            assert_eq!(
                index.resolve(digest, &path),
                Resolution::DuplicateOf(PathBuf::from("first.jpg"))
            );
        }

        assert_eq!(index.len(), 1);
        assert_eq!(index.duplicates_found(), 5);
    }

    #[test]
    fn test_distinct_digests_are_all_originals() {
        let mut index = DigestIndex::new();

        for i in 0..4 {
            let data = format!("file content {}", i);
            let path = PathBuf::from(format!("file{}.txt", i));
            assert_eq!(
                index.resolve(compute_data_hash(data.as_bytes()), &path),
                Resolution::FirstSeen
            );
        }

        assert_eq!(index.len(), 4);
        assert_eq!(index.duplicates_found(), 0);
    }

    #[test]
    fn test_empty_index() {
        let index = DigestIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.duplicates_found(), 0);
    }

    #[test]
    fn test_event_names() {
        let event = DuplicateEvent::new(
            PathBuf::from("/root/a.txt"),
            PathBuf::from("/root/sub/b.txt"),
            PathBuf::from("/root/_bin/b (1).txt"),
        );

        assert_eq!(event.original_name(), "a.txt");
        assert_eq!(event.duplicate_name(), "b.txt");
        assert_eq!(event.destination_name(), "b (1).txt");

        let detected_at = event.detected_at;
        let moved = event.with_destination(PathBuf::from("/root/_bin/b (2).txt"));
        assert_eq!(moved.destination_name(), "b (2).txt");
        assert_eq!(moved.duplicate_name(), "b.txt");
        assert_eq!(moved.detected_at, detected_at);
    }
}
