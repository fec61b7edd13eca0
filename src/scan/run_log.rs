//! Per-run text log
//!
//! One UTF-8 text file per scan, kept next to the quarantined files. Entries
//! are appended and flushed one at a time so a reader never sees a torn
//! entry. Every entry is also mirrored to the output channel that pollers
//! drain.
//!
//! Format:
//!
//! ```text
//! DUPLICATE FILE DETECTION STARTED AT: [2024-05-01T10:00:00.000000+02:00]
//! ----------------------------------------------------------------------------------------------------
//!
//! Calculating total files...
//! Total files to scan: 2
//! Duplicate found:
//!   Original: [a.txt]
//!   Duplicate: [b.txt]
//!   Moved as: [b.txt]
//!
//! ----------------------------------------------------------------------------------------------------
//! DUPLICATE FILE DETECTION FINISHED AT: [...]
//! Total Time Taken: [0:00:00.012]
//! Total Files Processed: [2]
//! Total Files Moved: [0]
//! ```
//!
//! Warnings and errors start with `*** ` so they stand out from normal entries.

use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{LibrarianError, Result};
use crate::duplicate::DuplicateEvent;
use crate::scan::mover::unique_destination;

/// Horizontal rule used around the banner and summary
const RULE_WIDTH: usize = 100;

/// Timestamp format used in file names (no characters unsafe on Windows)
const FILE_TIMESTAMP_FORMAT: &str = "%m-%d-%Y_%H-%M-%S";

/// One entry of the run log
#[derive(Debug, Clone)]
pub enum LogEntry<'a> {
    Started {
        at: DateTime<Local>,
    },
    CountingFiles,
    TotalFiles(u64),
    Duplicate(&'a DuplicateEvent),
    Warning(String),
    Error(String),
    Cancelled,
    Finished {
        at: DateTime<Local>,
        elapsed: Duration,
        processed: u64,
        moved: u64,
    },
    Fatal(String),
}

impl LogEntry<'_> {
    /// Text written to the log for this entry
    pub fn render(&self) -> String {
        match self {
            LogEntry::Started { at } => format!(
                "DUPLICATE FILE DETECTION STARTED AT: [{}]\n{}\n\n",
                iso_timestamp(at),
                rule()
            ),
            LogEntry::CountingFiles => "Calculating total files...\n".to_string(),
            LogEntry::TotalFiles(total) => format!("Total files to scan: {}\n", total),
            LogEntry::Duplicate(event) => format!(
                "Duplicate found:\n  Original: [{}]\n  Duplicate: [{}]\n  Moved as: [{}]\n\n",
                event.original_name(),
                event.duplicate_name(),
                event.destination_name()
            ),
            LogEntry::Warning(message) => format!("*** WARNING: {}\n\n", message),
            LogEntry::Error(message) => format!("*** ERROR {}\n\n", message),
            LogEntry::Cancelled => "\n*** USER CANCELLATION DETECTED ***\n".to_string(),
            LogEntry::Finished {
                at,
                elapsed,
                processed,
                moved,
            } => format!(
                "\n\n{}\nDUPLICATE FILE DETECTION FINISHED AT: [{}]\n\
                 Total Time Taken: [{}]\n\
                 Total Files Processed: [{}]\n\
                 Total Files Moved: [{}]\n",
                rule(),
                iso_timestamp(at),
                format_elapsed(*elapsed),
                processed,
                moved
            ),
            LogEntry::Fatal(message) => format!("*** UNEXPECTED ERROR in scan: {}\n", message),
        }
    }
}

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

fn iso_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
}

/// `H:MM:SS.mmm`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        elapsed.subsec_millis()
    )
}

/// Append-only log for one scan
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
    output: Option<Sender<String>>,
}

impl RunLog {
    /// Log path for a run started at `started_at`: `<prefix>_<timestamp>.txt`
    /// in `holding_dir`, with a numeric suffix if that name is taken.
    pub fn path_for(holding_dir: &Path, prefix: &str, started_at: &DateTime<Local>) -> PathBuf {
        let name = format!("{}_{}.txt", prefix, started_at.format(FILE_TIMESTAMP_FORMAT));
        unique_destination(holding_dir, &name)
    }

    /// Create the log. The holding directory must already exist and `path`
    /// must not: an existing file is never appended to or truncated.
    pub fn create(path: impl Into<PathBuf>, output: Option<Sender<String>>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| LibrarianError::LogOpen {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            output,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append and flush one entry, then mirror it to the output channel.
    pub fn write(&mut self, entry: &LogEntry<'_>) -> Result<()> {
        let text = entry.render();

        self.writer
            .write_all(text.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|source| LibrarianError::LogWrite {
                path: self.path.clone(),
                source,
            })?;

        if let Some(output) = &self.output {
            // A poller that went away must not stop the run
            let _ = output.send(text);
        }
        Ok(())
    }

    /// Flush and sync the log to disk
    pub fn close(mut self) -> Result<()> {
        self.writer
            .flush()
            .and_then(|_| self.writer.get_ref().sync_all())
            .map_err(|source| LibrarianError::LogWrite {
                path: self.path.clone(),
                source,
            })
    }
}
