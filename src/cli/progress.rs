//! Progress display and console output for the CLI
//!
//! The scan bar is driven by polling the job controller, never by the worker
//! itself, so a slow terminal cannot slow the scan down.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::{Duration, Instant};

use crate::job::JobStatus;

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Spinner shown while the counting pass runs (total still unknown)
fn counting_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷")
}

/// Bar shown during the processing pass
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

/// Bar left on screen after a completed scan
fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ [{bar:40.green/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━━")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Scan progress
// ============================================================================

/// Progress display for a running scan job
pub struct ScanProgress {
    bar: ProgressBar,
    start_time: Instant,
    counting: bool,
    quiet: bool,
}

impl ScanProgress {
    /// Create the display. A `quiet` display draws nothing and drops
    /// output lines (used for `--json`).
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(counting_style());
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner.set_message("Counting files...");
            spinner
        };

        Self {
            bar,
            start_time: Instant::now(),
            counting: true,
            quiet,
        }
    }

    /// Refresh from a status poll
    pub fn update(&mut self, status: &JobStatus) {
        if self.counting && status.total > 0 {
            self.counting = false;
            self.bar.set_style(progress_bar_style());
        }
        if self.counting {
            return;
        }

        // Files created between passes can push checked past the count
        self.bar.set_length(status.total.max(status.checked));
        self.bar.set_position(status.checked);
        self.bar.set_message(format!("{} moved", status.moved));
    }

    /// Print drained output lines above the bar
    pub fn print_lines(&self, lines: &[String]) {
        if self.quiet || lines.is_empty() {
            return;
        }
        self.bar.suspend(|| {
            let mut stdout = std::io::stdout().lock();
            for line in lines {
                let _ = stdout.write_all(line.as_bytes());
            }
            let _ = stdout.flush();
        });
    }

    /// Leave a completed bar on screen
    pub fn finish(&self) {
        self.bar.set_style(completed_style());
        self.bar.finish_with_message(format!(
            "Done in {}",
            format_duration(self.start_time.elapsed())
        ));
    }

    /// Leave the bar where it stopped with a reason
    pub fn abandon(&self, msg: &str) {
        self.bar.abandon_with_message(format!("✗ {}", msg));
    }
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    } else if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;

    fn status(checked: u64, total: u64) -> JobStatus {
        JobStatus {
            running: true,
            state: JobState::Running,
            checked,
            total,
            moved: 0,
            log_path: String::new(),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m");
    }

    #[test]
    fn test_scan_progress_follows_status() {
        let mut progress = ScanProgress::new(true);

        progress.update(&status(0, 0));
        assert!(progress.counting);

        progress.update(&status(3, 10));
        assert!(!progress.counting);
        assert_eq!(progress.bar.position(), 3);
        assert_eq!(progress.bar.length(), Some(10));

        // More files than counted
        progress.update(&status(12, 10));
        assert_eq!(progress.bar.length(), Some(12));
    }

    #[test]
    fn test_dual_writer_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.log");
        let mut writer = DualWriter {
            console: std::io::stderr(),
            file: std::fs::File::create(&path).unwrap(),
        };

        writer.write_all(b"line\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "line\n");
    }
}
