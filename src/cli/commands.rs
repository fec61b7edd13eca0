//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cli::progress::{
    print_error, print_header, print_info, print_success, print_warning, ScanProgress,
};
use crate::cli::{Args, Commands, ScanArgs};
use crate::core::config::{
    get_config_path, init_config, open_config_in_editor, Config, ConfigStore, ScanSettings,
};
use crate::job::{JobController, JobState, JobStatus};

/// How often the scan command polls the controller
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the appropriate command based on CLI arguments
///
/// Returns an error (and so a non-zero exit code) when a scan ends Failed.
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        Some(Commands::Scan(scan)) => {
            run_scan(config, scan, shutdown_flag)?;
        }
        None => {
            run_scan(config, &ScanArgs::default(), shutdown_flag)?;
        }
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
        }
        Some(Commands::Set { key, value }) => {
            let path = args
                .config
                .clone()
                .unwrap_or_else(Config::get_active_config_path);
            set_setting(path, key, value)?;
        }
    }

    Ok(())
}

/// Build the settings snapshot for one scan from config and CLI overrides
pub fn build_scan_settings(config: &Config, scan: &ScanArgs) -> Result<ScanSettings> {
    let root = match &scan.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("Could not determine the current directory")?,
    };
    if !root.is_dir() {
        bail!("Scan root is not a directory: {}", root.display());
    }

    let mut settings = config.weeding.scan_settings(root);
    if let Some(enabled) = scan.move_duplicates {
        settings = settings.with_move_enabled(enabled);
    }
    if let Some(dir) = &scan.holding_dir {
        settings = settings.with_holding_dir(dir.clone());
    }
    Ok(settings)
}

/// Run one scan in the foreground, showing progress until it ends.
///
/// Ctrl+C (seen through `shutdown_flag`) becomes a cooperative cancel.
pub fn run_scan(config: &Config, scan: &ScanArgs, shutdown_flag: Arc<AtomicBool>) -> Result<JobStatus> {
    let settings = build_scan_settings(config, scan)?;

    if !scan.json {
        print_header("DUPLICATE FILE SCAN");
        print_info(&format!("Root: {}", settings.root.display()));
        print_info(&format!("Holding folder: {}", settings.holding_dir.display()));
        if settings.move_enabled {
            print_info("Duplicates will be moved into the holding folder");
        } else {
            print_info("Report only: no files will be moved");
        }
        println!();
    }

    let controller = JobController::new();
    let log_path = controller.start(settings)?.into_result()?;
    debug!("Run log: {}", log_path.display());

    let mut display = ScanProgress::new(scan.json);
    let mut cancel_sent = false;
    loop {
        if !cancel_sent && shutdown_flag.load(Ordering::SeqCst) {
            // The job may have ended on its own in the meantime
            if let Err(err) = controller.cancel().into_result() {
                debug!("Cancel ignored: {}", err);
            }
            cancel_sent = true;
        }

        let status = controller.status();
        display.print_lines(&controller.drain_output().lines);
        display.update(&status);
        if !status.running {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    controller.wait()?;
    display.print_lines(&controller.drain_output().lines);

    let status = controller.status();
    let job = controller.last_job();

    match status.state {
        JobState::Completed => display.finish(),
        JobState::Cancelled => display.abandon("Cancelled"),
        _ => display.abandon("Failed"),
    }

    if scan.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!();
        let snapshot = controller.progress();
        match status.state {
            JobState::Completed => print_success("Scan complete"),
            JobState::Cancelled => print_warning("Scan cancelled"),
            _ => print_error("Scan failed"),
        }
        print_info(&format!("Files checked: {}", snapshot.checked_files));
        print_info(&format!("Duplicates found: {}", snapshot.duplicates_found));
        print_info(&format!("Files moved: {}", snapshot.files_moved));
        if snapshot.errors > 0 {
            print_warning(&format!("Files with errors: {}", snapshot.errors));
        }
        print_info(&format!("Log: {}", status.log_path));
    }

    if status.state == JobState::Failed {
        let reason = job
            .and_then(|job| job.error)
            .unwrap_or_else(|| "unknown error".to_string());
        error!("Scan failed: {}", reason);
        return Err(anyhow!("Scan failed: {}", reason));
    }

    Ok(status)
}

/// Handle the config command
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        // Delete existing config and create a fresh one
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                std::fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        info!("Created fresh config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            info!("Config file: {}", path.display());
            info!("Run 'librarian show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            if let Some(path) = get_config_path() {
                info!("You can manually edit the config at: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            if path.exists() {
                warn!("Overwriting existing file: {}", path.display());
            }
            std::fs::write(&path, Config::generate_default_config())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path
        }
        None => init_config()?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Quick tip: Run 'librarian config' to open the config in your editor.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[weeding]");
    info!("  excluded_folders = {:?}", config.weeding.excluded_folders);
    info!(
        "  user_excluded_files = {:?}",
        config.weeding.user_excluded_files
    );
    info!(
        "  holding_dir = \"{}\"",
        config.weeding.holding_dir.display()
    );
    info!("  log_name_prefix = \"{}\"", config.weeding.log_name_prefix);
    info!("  move_duplicates = {}", config.weeding.move_duplicates);
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
}

/// Change one setting in the config file at `path`
pub fn set_setting(path: PathBuf, key: &str, value: &str) -> Result<()> {
    let store = ConfigStore::open(&path)
        .with_context(|| format!("Failed to open config {}", path.display()))?;
    store.update(key, value)?;
    info!("Saved {} to {}", key, store.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scan_args(root: &std::path::Path) -> ScanArgs {
        ScanArgs {
            root: Some(root.to_path_buf()),
            json: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_scan_settings_apply_overrides() {
        let dir = TempDir::new().unwrap();
        let mut args = scan_args(dir.path());
        args.move_duplicates = Some(true);
        args.holding_dir = Some(PathBuf::from("quarantine"));

        let settings = build_scan_settings(&Config::default(), &args).unwrap();
        assert!(settings.move_enabled);
        assert_eq!(settings.holding_dir, dir.path().join("quarantine"));
        assert_eq!(settings.root, dir.path());
    }

    #[test]
    fn test_scan_settings_reject_missing_root() {
        let dir = TempDir::new().unwrap();
        let args = scan_args(&dir.path().join("nope"));
        assert!(build_scan_settings(&Config::default(), &args).is_err());
    }

    #[test]
    fn test_run_scan_reports_final_status() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"same").unwrap();
        fs::write(dir.path().join("b.txt"), b"same").unwrap();

        let mut args = scan_args(dir.path());
        args.move_duplicates = Some(true);
        let status = run_scan(&Config::default(), &args, Arc::new(AtomicBool::new(false))).unwrap();

        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.checked, 2);
        assert_eq!(status.moved, 1);
        assert!(dir
            .path()
            .join("_DuplicateHoldingBin")
            .join("b.txt")
            .exists());
    }

    #[test]
    fn test_run_scan_fails_when_holding_dir_cannot_be_created() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blocker"), b"").unwrap();

        let mut args = scan_args(dir.path());
        args.holding_dir = Some(PathBuf::from("blocker"));
        let result = run_scan(&Config::default(), &args, Arc::new(AtomicBool::new(false)));

        assert!(result.is_err());
    }

    #[test]
    fn test_run_scan_with_interrupt_already_set() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{}.txt", i)), b"same").unwrap();
        }

        let args = scan_args(dir.path());
        let status = run_scan(&Config::default(), &args, Arc::new(AtomicBool::new(true))).unwrap();

        // The cancel may land after a small tree is already done
        assert!(matches!(
            status.state,
            JobState::Cancelled | JobState::Completed
        ));
        assert!(status.checked <= 5);
    }

    #[test]
    fn test_set_setting_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        set_setting(path.clone(), "weeding.move_duplicates", "true").unwrap();
        set_setting(path.clone(), "weeding.holding_dir", "Quarantine").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.weeding.move_duplicates);
        assert_eq!(config.weeding.holding_dir, PathBuf::from("Quarantine"));
        assert!(set_setting(path, "weeding.nope", "1").is_err());
    }

    #[test]
    fn test_generate_config_to_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("generated.toml");

        generate_config_file(Some(path.clone())).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }
}
