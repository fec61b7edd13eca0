//! Job state and the responses handed to whatever transport drives the
//! controller. Everything here serializes to the JSON shapes pollers expect.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

use crate::core::error::{LibrarianError, Result};

// =============================================================================
// Job State
// =============================================================================

/// Lifecycle of the controller's current job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum JobState {
    /// Ready for a new job
    Idle = 0,
    /// A job is running
    Running = 1,
    /// The last job ran to the end
    Completed = 2,
    /// The last job stopped on request
    Cancelled = 3,
    /// The last job aborted on a fatal error
    Failed = 4,
}

impl From<u8> for JobState {
    fn from(value: u8) -> Self {
        match value {
            0 => JobState::Idle,
            1 => JobState::Running,
            2 => JobState::Completed,
            3 => JobState::Cancelled,
            4 => JobState::Failed,
            _ => JobState::Idle,
        }
    }
}

/// Record of one job, kept after it ends until the next one starts
#[derive(Debug, Clone, Serialize)]
pub struct ScanJob {
    pub state: JobState,
    pub started_at: DateTime<Local>,
    pub ended_at: Option<DateTime<Local>>,
    pub total: u64,
    pub checked: u64,
    pub moved: u64,
    pub log_path: PathBuf,
    /// Message of the fatal error, for failed jobs
    pub error: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    Started,
    AlreadyRunning,
}

/// Answer to a start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartResponse {
    pub status: StartStatus,
    /// Log of the job that is now running (new or existing)
    pub log_path: Option<PathBuf>,
}

impl StartResponse {
    /// Log path of the newly started job, or `AlreadyRunning`
    pub fn into_result(self) -> Result<PathBuf> {
        match (self.status, self.log_path) {
            (StartStatus::Started, path) => Ok(path.unwrap_or_default()),
            (StartStatus::AlreadyRunning, _) => Err(LibrarianError::AlreadyRunning),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelStatus {
    Cancelled,
    NotRunning,
}

/// Answer to a cancel request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CancelResponse {
    pub status: CancelStatus,
}

impl CancelResponse {
    /// `NotRunning` as an error
    pub fn into_result(self) -> Result<()> {
        match self.status {
            CancelStatus::Cancelled => Ok(()),
            CancelStatus::NotRunning => Err(LibrarianError::NotRunning),
        }
    }
}

/// Answer to a status poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub running: bool,
    pub state: JobState,
    pub checked: u64,
    pub total: u64,
    pub moved: u64,
    /// Empty until the first job starts
    pub log_path: String,
}

/// Output lines buffered since the previous drain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainedOutput {
    pub lines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_state_roundtrips_through_u8() {
        for state in [
            JobState::Idle,
            JobState::Running,
            JobState::Completed,
            JobState::Cancelled,
            JobState::Failed,
        ] {
            assert_eq!(JobState::from(state as u8), state);
        }
        assert_eq!(JobState::from(200), JobState::Idle);
    }

    #[test]
    fn test_responses_as_results() {
        let started = StartResponse {
            status: StartStatus::Started,
            log_path: Some(PathBuf::from("bin/log.txt")),
        };
        assert_eq!(started.into_result().unwrap(), PathBuf::from("bin/log.txt"));

        let busy = StartResponse {
            status: StartStatus::AlreadyRunning,
            log_path: None,
        };
        assert!(matches!(
            busy.into_result(),
            Err(LibrarianError::AlreadyRunning)
        ));

        let idle = CancelResponse {
            status: CancelStatus::NotRunning,
        };
        assert!(matches!(idle.into_result(), Err(LibrarianError::NotRunning)));
    }

    #[test]
    fn test_wire_shapes() {
        let start = StartResponse {
            status: StartStatus::AlreadyRunning,
            log_path: Some(PathBuf::from("bin/log.txt")),
        };
        assert_eq!(
            serde_json::to_value(&start).unwrap(),
            json!({"status": "already_running", "log_path": "bin/log.txt"})
        );

        let cancel = CancelResponse {
            status: CancelStatus::NotRunning,
        };
        assert_eq!(
            serde_json::to_value(cancel).unwrap(),
            json!({"status": "not_running"})
        );

        let status = JobStatus {
            running: true,
            state: JobState::Running,
            checked: 3,
            total: 10,
            moved: 1,
            log_path: "bin/log.txt".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "running": true,
                "state": "running",
                "checked": 3,
                "total": 10,
                "moved": 1,
                "log_path": "bin/log.txt"
            })
        );

        let drained = DrainedOutput {
            lines: vec!["a\n".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&drained).unwrap(),
            json!({"lines": ["a\n"]})
        );
    }
}
