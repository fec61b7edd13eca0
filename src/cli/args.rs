//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Find files with identical content under a folder and quarantine the copies
#[derive(Parser, Debug)]
#[command(name = "librarian")]
#[command(version)]
#[command(about = "Find duplicate files by content and move the copies into a holding folder", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

/// Options of a scan, shared by `scan` and the bare invocation
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Folder to scan (defaults to the current directory)
    pub root: Option<PathBuf>,

    /// Move duplicates into the holding folder (overrides config)
    #[arg(short, long, value_name = "BOOL")]
    pub move_duplicates: Option<bool>,

    /// Holding folder, relative to the scan root unless absolute (overrides config)
    #[arg(long, value_name = "DIR")]
    pub holding_dir: Option<PathBuf>,

    /// Print the final job status as JSON instead of progress output
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a folder for duplicate files (the default command)
    Scan(ScanArgs),

    /// Open the configuration file in your default editor
    ///
    /// The config file is stored at:
    /// - Windows: %APPDATA%\data_librarian\config.toml
    /// - Linux: ~/.config/data_librarian/config.toml
    /// - macOS: ~/Library/Application Support/data_librarian/config.toml
    ///
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,

    /// Change one setting and save it, e.g. `set weeding.move_duplicates true`
    Set {
        /// Setting to change, as `section.key`
        key: String,

        /// New value (TOML literal, or plain text for strings)
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_has_no_command() {
        let args = Args::try_parse_from(["librarian"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn test_scan_arguments() {
        let args = Args::try_parse_from([
            "librarian",
            "scan",
            "/data",
            "--move-duplicates",
            "true",
            "--holding-dir",
            "bin",
            "--json",
        ])
        .unwrap();

        match args.command {
            Some(Commands::Scan(scan)) => {
                assert_eq!(scan.root, Some(PathBuf::from("/data")));
                assert_eq!(scan.move_duplicates, Some(true));
                assert_eq!(scan.holding_dir, Some(PathBuf::from("bin")));
                assert!(scan.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args =
            Args::try_parse_from(["librarian", "show-config", "--config", "my.toml", "-l", "debug"])
                .unwrap();
        assert!(matches!(args.command, Some(Commands::ShowConfig)));
        assert_eq!(args.config, Some(PathBuf::from("my.toml")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_set_command() {
        let args =
            Args::try_parse_from(["librarian", "set", "weeding.move_duplicates", "true"]).unwrap();
        match args.command {
            Some(Commands::Set { key, value }) => {
                assert_eq!(key, "weeding.move_duplicates");
                assert_eq!(value, "true");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
