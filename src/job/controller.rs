//! Job Controller
//!
//! Owns at most one running scan. `start`, `cancel`, `status` and
//! `drain_output` may be called from any number of threads; none of them
//! waits on the worker's progress.

use chrono::Local;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use crate::core::config::ScanSettings;
use crate::core::error::{LibrarianError, Result};
use crate::job::cancel::CancellationToken;
use crate::job::progress::{ProgressCallback, ProgressSnapshot, ProgressTracker};
use crate::job::status::{
    CancelResponse, CancelStatus, DrainedOutput, JobState, JobStatus, ScanJob, StartResponse,
    StartStatus,
};
use crate::scan::runner::{RunOutcome, RunReport, ScanRun};

/// Line added to the output when a cancel request is accepted
pub const CANCEL_NOTICE: &str = "*** SCRIPT CANCELLED BY USER ***\n";

/// Thread-safe scan controller
///
/// The controller's own state is only ever `Idle` or `Running`. How the last
/// job ended is kept in its [`ScanJob`] record and reported by [`status`].
///
/// [`status`]: JobController::status
pub struct JobController {
    /// Idle or Running
    state: Arc<AtomicU8>,
    /// Stop request for the running job
    token: CancellationToken,
    /// Counters of the current (or last) job
    progress: Arc<ProgressTracker>,
    /// Record of the current (or last) job
    last_job: Arc<RwLock<Option<ScanJob>>>,
    /// Output lines from the worker and the controller
    output_tx: Sender<String>,
    output_rx: Receiver<String>,
    /// Worker thread handle
    worker_handle: Mutex<Option<JoinHandle<()>>>,
    /// Serializes start and cancel against each other
    lifecycle: Mutex<()>,
}

impl JobController {
    /// Create an idle controller
    pub fn new() -> Self {
        let (output_tx, output_rx) = crossbeam_channel::unbounded();

        Self {
            state: Arc::new(AtomicU8::new(JobState::Idle as u8)),
            token: CancellationToken::new(),
            progress: Arc::new(ProgressTracker::new()),
            last_job: Arc::new(RwLock::new(None)),
            output_tx,
            output_rx,
            worker_handle: Mutex::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// Get current state (`Idle` or `Running`)
    pub fn state(&self) -> JobState {
        JobState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == JobState::Running
    }

    /// Progress counters of the current or last job
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Record of the current or last job
    pub fn last_job(&self) -> Option<ScanJob> {
        self.last_job
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a scan with the given settings snapshot
    pub fn start(&self, settings: ScanSettings) -> Result<StartResponse> {
        self.start_inner(settings, None)
    }

    /// Start a scan, calling `callback` after each checked file
    pub fn start_with_progress(
        &self,
        settings: ScanSettings,
        callback: ProgressCallback,
    ) -> Result<StartResponse> {
        self.start_inner(settings, Some(callback))
    }

    fn start_inner(
        &self,
        settings: ScanSettings,
        callback: Option<ProgressCallback>,
    ) -> Result<StartResponse> {
        let _guard = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);

        if self
            .state
            .compare_exchange(
                JobState::Idle as u8,
                JobState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            debug!("Start rejected: a scan is already running");
            return Ok(StartResponse {
                status: StartStatus::AlreadyRunning,
                log_path: self.last_job().map(|job| job.log_path),
            });
        }

        // The previous worker has already set Idle; reap it
        self.join_worker();

        // Reset state
        self.token.reset();
        self.progress.reset();
        for _ in self.output_rx.try_iter() {}

        let mut run = ScanRun::new(settings, self.token.clone())
            .with_progress(Arc::clone(&self.progress))
            .with_output(self.output_tx.clone());
        if let Some(callback) = callback {
            run = run.with_callback(callback);
        }
        let log_path = run.log_path().to_path_buf();

        *self.last_job.write().unwrap_or_else(PoisonError::into_inner) = Some(ScanJob {
            state: JobState::Running,
            started_at: run.started_at(),
            ended_at: None,
            total: 0,
            checked: 0,
            moved: 0,
            log_path: log_path.clone(),
            error: None,
        });

        // Clone what we need for the thread
        let state = Arc::clone(&self.state);
        let progress = Arc::clone(&self.progress);
        let last_job = Arc::clone(&self.last_job);

        let spawned = thread::Builder::new()
            .name("librarian-scan".to_string())
            .spawn(move || Self::scan_worker(run, state, progress, last_job));

        match spawned {
            Ok(handle) => {
                *self
                    .worker_handle
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(handle);
                info!("Scan job started, log: {}", log_path.display());
                Ok(StartResponse {
                    status: StartStatus::Started,
                    log_path: Some(log_path),
                })
            }
            Err(err) => {
                error!("Failed to spawn scan worker: {}", err);
                self.finish_job(JobState::Failed, Some(err.to_string()));
                self.state.store(JobState::Idle as u8, Ordering::SeqCst);
                Err(err.into())
            }
        }
    }

    /// Ask the running scan to stop at its next checkpoint
    pub fn cancel(&self) -> CancelResponse {
        let _guard = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.is_running() {
            return CancelResponse {
                status: CancelStatus::NotRunning,
            };
        }

        self.token.cancel();
        let _ = self.output_tx.send(CANCEL_NOTICE.to_string());
        info!("Scan cancellation requested");

        CancelResponse {
            status: CancelStatus::Cancelled,
        }
    }

    /// Current state and counters
    pub fn status(&self) -> JobStatus {
        let running = self.is_running();
        let job = self.last_job();
        let state = match &job {
            _ if running => JobState::Running,
            Some(job) => job.state,
            None => JobState::Idle,
        };

        JobStatus {
            running,
            state,
            checked: self.progress.checked(),
            total: self.progress.total(),
            moved: self.progress.moved(),
            log_path: job
                .map(|job| job.log_path.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Take all buffered output lines. Each line is returned to exactly one
    /// caller.
    pub fn drain_output(&self) -> DrainedOutput {
        DrainedOutput {
            lines: self.output_rx.try_iter().collect(),
        }
    }

    /// Block until the current worker (if any) has finished
    pub fn wait(&self) -> Result<()> {
        let handle = self
            .worker_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| LibrarianError::WorkerPanicked("scan worker thread".to_string()))?;
        }
        Ok(())
    }

    /// Cancel any running scan and wait for it
    pub fn shutdown(&self) {
        let _ = self.cancel();
        if let Err(err) = self.wait() {
            warn!("Error while shutting down scan worker: {}", err);
        }
    }

    fn join_worker(&self) {
        if let Err(err) = self.wait() {
            warn!("Previous scan worker ended abnormally: {}", err);
        }
    }

    fn finish_job(&self, state: JobState, error: Option<String>) {
        Self::record_end(&self.last_job, &self.progress, state, error);
    }

    fn record_end(
        last_job: &RwLock<Option<ScanJob>>,
        progress: &ProgressTracker,
        state: JobState,
        error: Option<String>,
    ) {
        let snapshot = progress.snapshot();
        if let Some(job) = last_job
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            job.state = state;
            job.ended_at = Some(Local::now());
            job.total = snapshot.total_files;
            job.checked = snapshot.checked_files;
            job.moved = snapshot.files_moved;
            job.error = error;
        }
    }

    /// Worker thread function that runs one scan
    fn scan_worker(
        run: ScanRun,
        state: Arc<AtomicU8>,
        progress: Arc<ProgressTracker>,
        last_job: Arc<RwLock<Option<ScanJob>>>,
    ) {
        let report = panic::catch_unwind(AssertUnwindSafe(|| run.execute()));

        let (job_state, error) = match report {
            Ok(RunReport { outcome, .. }) => match outcome {
                RunOutcome::Completed => (JobState::Completed, None),
                RunOutcome::Cancelled => (JobState::Cancelled, None),
                RunOutcome::Failed(message) => (JobState::Failed, Some(message)),
            },
            Err(_) => {
                error!("Scan worker panicked");
                (JobState::Failed, Some("scan worker panicked".to_string()))
            }
        };

        Self::record_end(&last_job, &progress, job_state, error);
        info!("Scan job ended: {:?}", job_state);

        // Back to Idle last, so a new start sees a complete record
        state.store(JobState::Idle as u8, Ordering::SeqCst);
    }
}

impl Default for JobController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
