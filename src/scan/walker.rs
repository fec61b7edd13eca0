//! Directory walking
//!
//! The walker runs the same traversal twice: once to count eligible files,
//! once to hand them out for processing. Excluded folders are pruned before
//! descent, so nothing under them is ever visited. The cancellation token is
//! checked before every entry, which covers each directory and each file.

use log::{debug, trace};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::core::config::ScanSettings;
use crate::job::cancel::CancellationToken;

/// Name-based exclusions plus the holding directory itself
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    excluded_folders: HashSet<String>,
    excluded_files: HashSet<String>,
    holding_dir: Option<HoldingDirMatch>,
}

/// The holding directory is pruned by identity, not by name
#[derive(Debug, Clone)]
struct HoldingDirMatch {
    name: std::ffi::OsString,
    canonical: PathBuf,
}

impl ExclusionRules {
    pub fn new(excluded_folders: HashSet<String>, excluded_files: HashSet<String>) -> Self {
        Self {
            excluded_folders,
            excluded_files,
            holding_dir: None,
        }
    }

    /// Also prune `dir` wherever the walk reaches it.
    ///
    /// Has no effect if `dir` does not exist yet.
    pub fn with_holding_dir(mut self, dir: &Path) -> Self {
        self.holding_dir = match (dir.file_name(), fs::canonicalize(dir)) {
            (Some(name), Ok(canonical)) => Some(HoldingDirMatch {
                name: name.to_os_string(),
                canonical,
            }),
            _ => None,
        };
        self
    }

    pub fn from_settings(settings: &ScanSettings) -> Self {
        Self::new(
            settings.excluded_folders.clone(),
            settings.excluded_files.clone(),
        )
        .with_holding_dir(&settings.holding_dir)
    }

    fn is_excluded_dir(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }

        let name = entry.file_name().to_string_lossy();
        if self.excluded_folders.contains(name.as_ref()) {
            return true;
        }

        match &self.holding_dir {
            Some(holding) if entry.file_name() == holding.name => fs::canonicalize(entry.path())
                .map(|p| p == holding.canonical)
                .unwrap_or(false),
            _ => false,
        }
    }

    fn is_excluded_file(&self, entry: &DirEntry) -> bool {
        self.excluded_files
            .contains(entry.file_name().to_string_lossy().as_ref())
    }
}

/// Two-phase walker over one root
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
    rules: ExclusionRules,
    token: CancellationToken,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>, rules: ExclusionRules, token: CancellationToken) -> Self {
        Self {
            root: root.into(),
            rules,
            token,
        }
    }

    /// Walker for a scan, using the settings' root and exclusions
    pub fn for_settings(settings: &ScanSettings, token: CancellationToken) -> Self {
        Self::new(
            settings.root.clone(),
            ExclusionRules::from_settings(settings),
            token,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Phase 1: count eligible files. Unreadable directories are skipped.
    pub fn count_files(&self) -> u64 {
        let total = self.files().filter(|item| item.is_ok()).count() as u64;
        debug!("Counted {} files under {}", total, self.root.display());
        total
    }

    /// Phase 2: lazily yield eligible file paths.
    ///
    /// Errors (e.g. a directory that cannot be read) are yielded so the
    /// caller can record them; the walk continues past them.
    pub fn files(&self) -> WalkFiles<'_> {
        WalkFiles {
            inner: WalkDir::new(&self.root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
            rules: &self.rules,
            token: &self.token,
            stopped: false,
        }
    }
}

/// Iterator over eligible files, see [`DirectoryWalker::files`]
pub struct WalkFiles<'a> {
    inner: walkdir::IntoIter,
    rules: &'a ExclusionRules,
    token: &'a CancellationToken,
    stopped: bool,
}

impl Iterator for WalkFiles<'_> {
    type Item = Result<PathBuf, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.stopped {
                return None;
            }
            if self.token.is_cancelled() {
                debug!("Walk stopped by cancellation");
                self.stopped = true;
                return None;
            }

            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };

            if entry.file_type().is_dir() {
                if self.rules.is_excluded_dir(&entry) {
                    trace!("Pruning excluded folder {}", entry.path().display());
                    self.inner.skip_current_dir();
                }
                continue;
            }

            if !is_regular_file(&entry) || self.rules.is_excluded_file(&entry) {
                continue;
            }

            return Some(Ok(entry.into_path()));
        }
    }
}

/// Regular files only. Symlinks are never hashed or moved, so a link can
/// not stand in for the file it points at.
fn is_regular_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
}
