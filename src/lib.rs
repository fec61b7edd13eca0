//! Data Librarian Library
//!
//! Finds files with identical content inside a directory tree and
//! quarantines (or only reports) the copies.
//!
//! # Architecture
//!
//! - [`core`] - Configuration and error handling
//! - [`duplicate`] - SHA-256 content hashing and first-seen-wins resolution
//! - [`scan`] - Directory walking, quarantine moves, the run log and the
//!   scan routine that ties them together
//! - [`job`] - Cancellation, progress counters and the job controller
//! - [`cli`] - Command-line interface (only used by the binary)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use data_librarian::core::config::Config;
//! use data_librarian::job::JobController;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let settings = config.weeding.scan_settings("/data/photos");
//!
//!     let controller = JobController::new();
//!     let response = controller.start(settings)?;
//!     println!("log: {:?}", response.log_path);
//!
//!     // Poll from any thread while the scan runs
//!     while controller.status().running {
//!         for line in controller.drain_output().lines {
//!             print!("{}", line);
//!         }
//!         std::thread::sleep(std::time::Duration::from_millis(200));
//!     }
//!
//!     controller.wait()?;
//!     println!("{:?}", controller.status());
//!     Ok(())
//! }
//! ```
//!
//! # Guarantees
//!
//! - The first file seen with a given content is the original; every later
//!   file with the same content is a duplicate of it.
//! - Files are moved, never deleted, and never overwrite anything in the
//!   holding folder.
//! - Every run leaves a text log in the holding folder, closed with a
//!   summary even when the run is cancelled.

pub mod cli;
pub mod core;
pub mod duplicate;
pub mod job;
pub mod scan;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
