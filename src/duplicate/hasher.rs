//! Content hashing
//!
//! Files are hashed with SHA256 by streaming them through a fixed-size
//! buffer, so memory use does not depend on file size.

use crate::core::error::{LibrarianError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Buffer size for streaming hash computation (64KB)
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// SHA256 hash represented as a fixed-size array
pub type Sha256Hash = [u8; 32];

/// Compute the SHA256 digest of a file.
///
/// Any I/O failure (permissions, a file that vanished mid-scan, a read
/// error) comes back as [`LibrarianError::Unreadable`] so the caller can
/// log it and move on.
pub fn compute_file_hash(path: &Path) -> Result<Sha256Hash> {
    let unreadable = |source| LibrarianError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(unreadable)?;
    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(unreadable)?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().into())
}

/// Compute SHA256 hash of in-memory data
#[cfg(test)]
pub(crate) fn compute_data_hash(data: &[u8]) -> Sha256Hash {
    Sha256::digest(data).into()
}

/// Convert a hash to a hexadecimal string
pub fn hash_to_hex(hash: &Sha256Hash) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_compute_data_hash() {
        let hash = compute_data_hash(b"Hello, World!");

        // Known SHA256 hash of "Hello, World!"
        let expected = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";
        assert_eq!(hash_to_hex(&hash), expected);
    }

    #[test]
    fn test_file_hash_matches_data_hash() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"Hello, World!").unwrap();

        let hash = compute_file_hash(&path).unwrap();
        assert_eq!(hash, compute_data_hash(b"Hello, World!"));
    }

    #[test]
    fn test_file_larger_than_buffer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..HASH_BUFFER_SIZE * 3 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        fs::write(&path, &data).unwrap();

        assert_eq!(compute_file_hash(&path).unwrap(), compute_data_hash(&data));
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let expected = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(hash_to_hex(&compute_file_hash(&path).unwrap()), expected);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.txt");

        match compute_file_hash(&path) {
            Err(LibrarianError::Unreadable { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Unreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_different_data_different_hash() {
        assert_ne!(
            compute_data_hash(b"first file content"),
            compute_data_hash(b"second file content")
        );
    }
}
