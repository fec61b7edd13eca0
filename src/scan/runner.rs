//! Scan execution
//!
//! [`ScanRun`] is one complete scan: set up the holding directory and log,
//! count, then walk, hash, resolve and (optionally) move. It runs on a single
//! thread, so log entries are strictly in walk order.

use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use log::{debug, error, info, trace, warn};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::core::config::ScanSettings;
use crate::core::error::{LibrarianError, Result};
use crate::duplicate::{compute_file_hash, hash_to_hex, DigestIndex, DuplicateEvent, Resolution};
use crate::job::cancel::CancellationToken;
use crate::job::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
use crate::scan::mover::{MoveOutcome, Quarantine};
use crate::scan::run_log::{LogEntry, RunLog};
use crate::scan::walker::DirectoryWalker;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// Final figures of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub ended_at: DateTime<Local>,
    /// Files checked in the processing pass
    pub processed: u64,
    /// Duplicates moved into the holding directory
    pub moved: u64,
}

/// Per-run counters kept by the worker itself
#[derive(Debug, Default)]
struct Tally {
    processed: u64,
    moved: u64,
}

/// One scan, ready to execute
pub struct ScanRun {
    settings: ScanSettings,
    started_at: DateTime<Local>,
    log_path: PathBuf,
    token: CancellationToken,
    progress: Arc<ProgressTracker>,
    output: Option<Sender<String>>,
    callback: Option<ProgressCallback>,
}

impl ScanRun {
    /// Prepare a run that starts now. The log path is decided here so
    /// callers can report it before the worker opens the file.
    pub fn new(settings: ScanSettings, token: CancellationToken) -> Self {
        let started_at = Local::now();
        let log_path = RunLog::path_for(&settings.holding_dir, &settings.log_prefix, &started_at);
        Self {
            settings,
            started_at,
            log_path,
            token,
            progress: Arc::new(ProgressTracker::new()),
            output: None,
            callback: None,
        }
    }

    /// Report counters through a shared tracker
    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    /// Mirror log entries and critical errors to a channel
    pub fn with_output(mut self, output: Sender<String>) -> Self {
        self.output = Some(output);
        self
    }

    /// Call `callback` after each checked file
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Run the scan to the end, cancellation or failure.
    ///
    /// Never panics and never returns an error: failures end up in the
    /// report as [`RunOutcome::Failed`] and, when possible, in the log.
    pub fn execute(self) -> RunReport {
        let clock = Instant::now();
        info!(
            "Scan started: root={}, holding_dir={}, move={}",
            self.settings.root.display(),
            self.settings.holding_dir.display(),
            self.settings.move_enabled
        );

        let mut log = match self.open_log() {
            Ok(log) => log,
            Err(err) => {
                error!("Scan setup failed: {}", err);
                self.emit(format!("*** CRITICAL ERROR: {}\n", err));
                return self.report(RunOutcome::Failed(err.to_string()), Tally::default());
            }
        };

        let mut tally = Tally::default();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.process(&mut log, &mut tally, clock)
        }))
        .unwrap_or_else(|payload| Err(LibrarianError::WorkerPanicked(panic_message(&*payload))));

        let result = match result {
            Ok(outcome) => log.close().map(|_| outcome),
            Err(err) => {
                if !matches!(err, LibrarianError::LogWrite { .. }) {
                    let _ = log.write(&LogEntry::Fatal(err.to_string()));
                }
                let _ = log.close();
                Err(err)
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Scan failed: {}", err);
                self.emit(format!("*** CRITICAL ERROR: {}\n", err));
                RunOutcome::Failed(err.to_string())
            }
        };

        info!(
            "Scan ended ({:?}): {} processed, {} moved",
            outcome, tally.processed, tally.moved
        );
        self.report(outcome, tally)
    }

    fn open_log(&self) -> Result<RunLog> {
        fs::create_dir_all(&self.settings.holding_dir).map_err(|source| {
            LibrarianError::HoldingDir {
                path: self.settings.holding_dir.clone(),
                source,
            }
        })?;
        RunLog::create(&self.log_path, self.output.clone())
    }

    fn process(&self, log: &mut RunLog, tally: &mut Tally, clock: Instant) -> Result<RunOutcome> {
        log.write(&LogEntry::Started {
            at: self.started_at,
        })?;

        log.write(&LogEntry::CountingFiles)?;
        let walker = DirectoryWalker::for_settings(&self.settings, self.token.clone());
        let total = walker.count_files();
        self.progress.set_total(total);
        log.write(&LogEntry::TotalFiles(total))?;

        let mut index = DigestIndex::new();
        let mover = Quarantine::new(&self.settings.holding_dir, self.settings.move_enabled);

        for item in walker.files() {
            let path = match item {
                Ok(path) => path,
                Err(err) => {
                    warn!("Walk error: {}", err);
                    self.progress.record_error();
                    log.write(&LogEntry::Error(format!("reading directory: {}", err)))?;
                    continue;
                }
            };

            tally.processed += 1;
            let checked = self.progress.record_checked();
            self.check_file(&path, &mut index, &mover, log, tally)?;

            if let Some(callback) = &self.callback {
                callback(&ProgressUpdate {
                    checked,
                    total,
                    current_file: path,
                });
            }
        }

        debug!(
            "{} distinct contents, {} duplicates",
            index.len(),
            index.duplicates_found()
        );

        let outcome = if self.token.is_cancelled() {
            log.write(&LogEntry::Cancelled)?;
            RunOutcome::Cancelled
        } else {
            RunOutcome::Completed
        };

        log.write(&LogEntry::Finished {
            at: Local::now(),
            elapsed: clock.elapsed(),
            processed: tally.processed,
            moved: tally.moved,
        })?;

        Ok(outcome)
    }

    /// Hash one file and deal with it if it is a duplicate.
    /// Only log failures are returned; per-file problems are logged here.
    fn check_file(
        &self,
        path: &Path,
        index: &mut DigestIndex,
        mover: &Quarantine,
        log: &mut RunLog,
        tally: &mut Tally,
    ) -> Result<()> {
        let digest = match compute_file_hash(path) {
            Ok(digest) => digest,
            Err(err) if err.is_recoverable() => {
                debug!("Skipping unreadable file: {}", err);
                self.progress.record_error();
                return log.write(&LogEntry::Error(format!(
                    "processing file [{}]: {}",
                    path.display(),
                    err
                )));
            }
            Err(err) => return Err(err),
        };
        trace!("{} {}", hash_to_hex(&digest), path.display());

        let original = match index.resolve(digest, path) {
            Resolution::FirstSeen => return Ok(()),
            Resolution::DuplicateOf(original) => original,
        };

        self.progress.record_duplicate();
        let planned =
            DuplicateEvent::new(original, path.to_path_buf(), mover.plan_destination(path));
        let moved = mover.quarantine(&planned);
        log.write(&LogEntry::Duplicate(&recorded_event(planned, &moved)))?;
        self.record_move(path, moved, log, tally)
    }

    /// Count and log what happened to a duplicate handed to the mover
    fn record_move(
        &self,
        path: &Path,
        moved: Result<MoveOutcome>,
        log: &mut RunLog,
        tally: &mut Tally,
    ) -> Result<()> {
        match moved {
            Ok(MoveOutcome::Moved(_)) => {
                tally.moved += 1;
                self.progress.record_moved();
                Ok(())
            }
            Ok(MoveOutcome::Disabled) => Ok(()),
            Ok(MoveOutcome::Vanished) => log.write(&LogEntry::Warning(format!(
                "File vanished before move: {}",
                path.display()
            ))),
            Err(err) if err.is_recoverable() => {
                self.progress.record_error();
                log.write(&LogEntry::Error(format!("moving file: {}", err)))
            }
            Err(err) => Err(err),
        }
    }

    fn emit(&self, line: String) {
        if let Some(output) = &self.output {
            let _ = output.send(line);
        }
    }

    fn report(&self, outcome: RunOutcome, tally: Tally) -> RunReport {
        RunReport {
            outcome,
            ended_at: Local::now(),
            processed: tally.processed,
            moved: tally.moved,
        }
    }
}

/// The event as it goes into the log: if the move picked a different name
/// than planned, the log shows where the file really went.
fn recorded_event(planned: DuplicateEvent, moved: &Result<MoveOutcome>) -> DuplicateEvent {
    match moved {
        Ok(MoveOutcome::Moved(destination)) if *destination != planned.destination => {
            planned.with_destination(destination.clone())
        }
        _ => planned,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
