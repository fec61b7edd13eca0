//! Quarantine mover
//!
//! The only part of the librarian that changes scanned content. Duplicates
//! are moved (never deleted) into the holding directory under a sanitized,
//! collision-free name.

use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::error::{LibrarianError, Result};
use crate::duplicate::DuplicateEvent;

/// Characters that are unsafe in file names on at least one common platform
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Device names Windows refuses as file names, with or without extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Result of handing a duplicate to the mover
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Moving is switched off; nothing touched
    Disabled,
    /// Moved to this path
    Moved(PathBuf),
    /// The duplicate was gone before it could be moved
    Vanished,
}

/// Make a file name safe to create in the holding directory.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_end_matches(['.', ' ']).trim_start();
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }

    let stem = trimmed.split('.').next().unwrap_or(trimmed);
    if RESERVED_NAMES
        .iter()
        .any(|reserved| stem.eq_ignore_ascii_case(reserved))
    {
        return format!("_{}", trimmed);
    }

    trimmed.to_string()
}

/// First free path in `dir` for `name`: `name`, then `stem (1).ext`, `stem (2).ext`, ...
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|n| dir.join(format!("{} ({}){}", stem, n, extension)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Moves duplicates into the holding directory
#[derive(Debug, Clone)]
pub struct Quarantine {
    holding_dir: PathBuf,
    enabled: bool,
}

impl Quarantine {
    pub fn new(holding_dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            holding_dir: holding_dir.into(),
            enabled,
        }
    }

    /// Where `duplicate` would land if moved now
    pub fn plan_destination(&self, duplicate: &Path) -> PathBuf {
        let name = duplicate
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        unique_destination(&self.holding_dir, &sanitize_file_name(&name))
    }

    /// Move the event's duplicate into the holding directory.
    ///
    /// The planned destination is re-checked first; if something appeared
    /// there in the meantime a fresh name is chosen. A failed move leaves the
    /// file where it was.
    pub fn quarantine(&self, event: &DuplicateEvent) -> Result<MoveOutcome> {
        if !self.enabled {
            return Ok(MoveOutcome::Disabled);
        }

        if fs::symlink_metadata(&event.duplicate).is_err() {
            warn!("File vanished before move: {}", event.duplicate.display());
            return Ok(MoveOutcome::Vanished);
        }

        let destination = if event.destination.exists() {
            self.plan_destination(&event.duplicate)
        } else {
            event.destination.clone()
        };

        move_file(&event.duplicate, &destination).map_err(|source| LibrarianError::Move {
            from: event.duplicate.clone(),
            to: destination.clone(),
            source,
        })?;

        debug!(
            "Moved {} -> {}",
            event.duplicate.display(),
            destination.display()
        );
        Ok(MoveOutcome::Moved(destination))
    }
}

/// Rename, falling back to copy + remove across filesystems
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device_error(&err) => match fs::copy(src, dest) {
            Ok(_) => {
                fs::File::open(dest)?.sync_all()?;
                fs::remove_file(src)
            }
            Err(copy_err) => {
                let _ = fs::remove_file(dest);
                Err(copy_err)
            }
        },
        Err(err) => Err(err),
    }
}

fn is_cross_device_error(err: &io::Error) -> bool {
    match err.raw_os_error() {
        Some(18) => true, // POSIX EXDEV
        Some(17) => cfg!(windows), // ERROR_NOT_SAME_DEVICE
        _ => false,
    }
}
