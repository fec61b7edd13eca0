//! Job control
//!
//! A [`JobController`] runs one scan at a time on a background thread and
//! answers start, cancel, status and drain requests from any thread.

pub mod cancel;
pub mod controller;
pub mod progress;
pub mod status;

pub use cancel::CancellationToken;
pub use controller::{JobController, CANCEL_NOTICE};
pub use progress::{ProgressCallback, ProgressSnapshot, ProgressTracker, ProgressUpdate};
pub use status::{
    CancelResponse, CancelStatus, DrainedOutput, JobState, JobStatus, ScanJob, StartResponse,
    StartStatus,
};
