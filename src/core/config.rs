//! Configuration module for the data librarian
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\data_librarian\config.toml
//! - Linux: ~/.config/data_librarian/config.toml
//! - macOS: ~/Library/Application Support/data_librarian/config.toml
//!
//! A loaded [`Config`] is never mutated in place while a scan may be reading
//! it. Changes go through [`Config::with_setting`], which returns a new value,
//! and [`ConfigStore`] swaps the shared snapshot once the file is saved.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Application name used for config directory
const APP_NAME: &str = "data_librarian";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// File names that are never scanned, whatever the user configures.
/// These are the librarian's own config and diagnostic log files.
pub const SYSTEM_EXCLUDED_FILES: &[&str] =
    &["config.toml", "data_librarian.toml", "data_librarian.log"];

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// Creates the config directory and writes the default config template.
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_dir = ensure_config_dir()?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        fs::write(&config_path, Config::generate_default_config())
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Open the configuration file in the default application.
pub fn open_config_in_editor() -> Result<PathBuf, ConfigError> {
    let config_path = init_config()?;

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut cmd = std::process::Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(&config_path);
        cmd
    };

    #[cfg(target_os = "macos")]
    let mut command = {
        let mut cmd = std::process::Command::new("open");
        cmd.arg(&config_path);
        cmd
    };

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut command = {
        let mut cmd = std::process::Command::new("xdg-open");
        cmd.arg(&config_path);
        cmd
    };

    command
        .spawn()
        .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;

    Ok(config_path)
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Duplicate detection ("weeding") settings
    pub weeding: WeedingConfig,

    /// Diagnostic logging settings
    pub logging: LoggingConfig,
}

/// Duplicate detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeedingConfig {
    /// Folder names skipped at any depth of the scan
    pub excluded_folders: Vec<String>,

    /// Extra file names to skip, merged with [`SYSTEM_EXCLUDED_FILES`]
    pub user_excluded_files: Vec<String>,

    /// Where duplicates and run logs go. Relative paths resolve
    /// against the scan root.
    pub holding_dir: PathBuf,

    /// Prefix of the per-run log file name
    pub log_name_prefix: String,

    /// Move duplicates into the holding directory (false = report only)
    pub move_duplicates: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for WeedingConfig {
    fn default() -> Self {
        Self {
            excluded_folders: vec!["_DuplicateHoldingBin".to_string()],
            user_excluded_files: Vec::new(),
            holding_dir: PathBuf::from("_DuplicateHoldingBin"),
            log_name_prefix: "_duplicate_log".to_string(),
            move_duplicates: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./data_librarian.log"),
        }
    }
}

impl WeedingConfig {
    /// All excluded file names: system names plus the user's.
    pub fn excluded_files(&self) -> HashSet<String> {
        SYSTEM_EXCLUDED_FILES
            .iter()
            .map(|name| name.to_string())
            .chain(self.user_excluded_files.iter().cloned())
            .collect()
    }

    /// Resolve the holding directory for a scan of `root`.
    pub fn resolve_holding_dir(&self, root: &Path) -> PathBuf {
        if self.holding_dir.is_absolute() {
            self.holding_dir.clone()
        } else {
            root.join(&self.holding_dir)
        }
    }

    /// Freeze these settings into the snapshot a single scan runs with.
    pub fn scan_settings(&self, root: impl Into<PathBuf>) -> ScanSettings {
        let root = root.into();
        ScanSettings {
            excluded_folders: self.excluded_folders.iter().cloned().collect(),
            excluded_files: self.excluded_files(),
            holding_dir: self.resolve_holding_dir(&root),
            move_enabled: self.move_duplicates,
            log_prefix: self.log_name_prefix.clone(),
            root,
        }
    }
}

/// Immutable settings for one scan, taken when the scan starts.
///
/// Later config changes never reach a scan that is already running.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    /// Directory tree to scan
    pub root: PathBuf,
    /// Folder names pruned at every depth
    pub excluded_folders: HashSet<String>,
    /// File names never counted or hashed
    pub excluded_files: HashSet<String>,
    /// Resolved holding directory
    pub holding_dir: PathBuf,
    /// Whether duplicates are moved or only reported
    pub move_enabled: bool,
    /// Run log file name prefix
    pub log_prefix: String,
}

impl ScanSettings {
    /// Override the move switch (used by CLI flags)
    pub fn with_move_enabled(mut self, enabled: bool) -> Self {
        self.move_enabled = enabled;
        self
    }

    /// Override the holding directory (relative paths resolve against root)
    pub fn with_holding_dir(mut self, dir: PathBuf) -> Self {
        self.holding_dir = if dir.is_absolute() {
            dir
        } else {
            self.root.join(dir)
        };
        self
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./config.toml
    /// 2. ./data_librarian.toml
    /// 3. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::get_active_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the path where the config file is (or would be) located.
    ///
    /// Returns the first existing config file path, or the standard location if none exists.
    pub fn get_active_config_path() -> PathBuf {
        let local_paths = [
            PathBuf::from("./config.toml"),
            PathBuf::from("./data_librarian.toml"),
        ];

        for path in &local_paths {
            if path.exists() {
                return path.clone();
            }
        }

        get_config_path().unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::WriteError(parent.to_path_buf(), e.to_string())
                })?;
            }
        }

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }

    /// Return a copy of this config with one `section.key` changed.
    ///
    /// The value is read as a TOML literal (`true`, `["a", "b"]`, `"text"`);
    /// if that does not fit the field, it is retried as a bare string.
    pub fn with_setting(&self, key: &str, raw_value: &str) -> Result<Config, ConfigError> {
        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let root =
            toml::Value::try_from(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        let known = root
            .get(section)
            .and_then(|s| s.as_table())
            .map(|table| table.contains_key(field))
            .unwrap_or(false);
        if !known {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut last_error = String::new();
        for candidate in setting_candidates(raw_value) {
            let mut updated = root.clone();
            if let Some(table) = updated.get_mut(section).and_then(|s| s.as_table_mut()) {
                table.insert(field.to_string(), candidate);
            }
            match updated.try_into::<Config>() {
                Ok(config) => return Ok(config),
                Err(e) => last_error = e.to_string(),
            }
        }

        Err(ConfigError::InvalidValue(key.to_string(), last_error))
    }
}

/// Possible TOML readings of a raw setting, most specific first.
fn setting_candidates(raw: &str) -> Vec<toml::Value> {
    let mut candidates = Vec::with_capacity(2);
    if let Ok(mut table) = toml::from_str::<toml::Table>(&format!("value = {}", raw)) {
        if let Some(value) = table.remove("value") {
            candidates.push(value);
        }
    }
    if !matches!(candidates.first(), Some(toml::Value::String(_))) {
        candidates.push(toml::Value::String(raw.to_string()));
    }
    candidates
}

/// Shared, file-backed configuration.
///
/// Readers take an `Arc<Config>` snapshot; updates build a new config,
/// save it, then swap the snapshot.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<Config>>,
}

impl ConfigStore {
    /// Open the store at `path`, falling back to defaults if the file is missing
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = if path.exists() {
            Config::load(&path)?
        } else {
            Config::default()
        };

        Ok(Self {
            path,
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current configuration snapshot
    pub fn snapshot(&self) -> Arc<Config> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Change one setting, persist it and publish the new snapshot
    pub fn update(&self, key: &str, raw_value: &str) -> Result<Arc<Config>, ConfigError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let updated = current.with_setting(key, raw_value)?;
        updated.save(&self.path)?;

        log::info!("Updated {} = {}", key, raw_value);
        *current = Arc::new(updated);
        Ok(Arc::clone(&current))
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// Setting key does not name a known `section.key`
    UnknownKey(String),
    /// Setting value does not fit the field's type
    InvalidValue(String, String),
    /// Could not determine config directory
    ConfigDirNotFound,
    /// Failed to open config file in editor
    OpenError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ParseError(path, err) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(
                    f,
                    "Failed to write config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::UnknownKey(key) => {
                write!(f, "Unknown setting '{}' (expected section.key)", key)
            }
            ConfigError::InvalidValue(key, err) => {
                write!(f, "Invalid value for '{}': {}", key, err)
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::OpenError(path, err) => {
                write!(
                    f,
                    "Failed to open config file '{}': {}",
                    path.display(),
                    err
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_weeding_defaults() {
        let config = WeedingConfig::default();

        assert_eq!(config.excluded_folders, vec!["_DuplicateHoldingBin"]);
        assert_eq!(config.holding_dir, PathBuf::from("_DuplicateHoldingBin"));
        assert_eq!(config.log_name_prefix, "_duplicate_log");
        assert!(!config.move_duplicates);
        assert!(config.user_excluded_files.is_empty());
    }

    #[test]
    fn test_excluded_files_merges_system_and_user() {
        let config = WeedingConfig {
            user_excluded_files: vec!["notes.md".to_string()],
            ..Default::default()
        };

        let excluded = config.excluded_files();
        assert!(excluded.contains("notes.md"));
        for name in SYSTEM_EXCLUDED_FILES {
            assert!(excluded.contains(*name));
        }
    }

    #[test]
    fn test_scan_settings_resolves_relative_holding_dir() {
        let config = WeedingConfig::default();
        let settings = config.scan_settings("/data/archive");

        assert_eq!(
            settings.holding_dir,
            PathBuf::from("/data/archive/_DuplicateHoldingBin")
        );
        assert!(settings.excluded_folders.contains("_DuplicateHoldingBin"));
        assert_eq!(settings.log_prefix, "_duplicate_log");
    }

    #[test]
    fn test_scan_settings_overrides() {
        let settings = WeedingConfig::default()
            .scan_settings("/data")
            .with_move_enabled(true)
            .with_holding_dir(PathBuf::from("quarantine"));

        assert!(settings.move_enabled);
        assert_eq!(settings.holding_dir, PathBuf::from("/data/quarantine"));
    }

    #[test]
    fn test_default_template_parses() {
        let config: Config = toml::from_str(&Config::generate_default_config()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[weeding]\nmove_duplicates = true\n").unwrap();

        assert!(config.weeding.move_duplicates);
        assert_eq!(config.weeding.log_name_prefix, "_duplicate_log");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_with_setting_returns_new_config() {
        let original = Config::default();
        let updated = original
            .with_setting("weeding.move_duplicates", "true")
            .unwrap();

        assert!(updated.weeding.move_duplicates);
        assert!(!original.weeding.move_duplicates);
    }

    #[test]
    fn test_with_setting_parses_lists_and_bare_strings() {
        let config = Config::default()
            .with_setting("weeding.user_excluded_files", r#"["a.txt", "b.txt"]"#)
            .unwrap()
            .with_setting("weeding.holding_dir", "quarantine")
            .unwrap()
            .with_setting("weeding.log_name_prefix", "2024")
            .unwrap();

        assert_eq!(config.weeding.user_excluded_files, vec!["a.txt", "b.txt"]);
        assert_eq!(config.weeding.holding_dir, PathBuf::from("quarantine"));
        assert_eq!(config.weeding.log_name_prefix, "2024");
    }

    #[test]
    fn test_with_setting_rejects_unknown_and_invalid() {
        let config = Config::default();

        assert!(matches!(
            config.with_setting("weeding.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.with_setting("no_section", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.with_setting("weeding.move_duplicates", "sometimes"),
            Err(ConfigError::InvalidValue(_, _))
        ));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::default()
            .with_setting("weeding.move_duplicates", "true")
            .unwrap();
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[weeding\nmove_duplicates = ").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ParseError(_, _))
        ));
    }

    #[test]
    fn test_store_update_persists_and_swaps_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let store = ConfigStore::open(&path).unwrap();

        let before = store.snapshot();
        store.update("weeding.move_duplicates", "true").unwrap();
        let after = store.snapshot();

        assert!(!before.weeding.move_duplicates);
        assert!(after.weeding.move_duplicates);
        assert!(Config::load(&path).unwrap().weeding.move_duplicates);
    }

    #[test]
    fn test_store_failed_update_keeps_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::open(dir.path().join("config.toml")).unwrap();

        assert!(store.update("weeding.move_duplicates", "maybe").is_err());
        assert_eq!(*store.snapshot(), Config::default());
        assert!(!store.path().exists());
    }
}
