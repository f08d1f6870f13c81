/*
 * Configuration for the diagnostics session: which application's user data
 * folder sessions go under, whether the primary thread is mirrored to the
 * console, and how errors reach the user. Settings are persisted as JSON in
 * the application's local configuration directory; a missing file means
 * defaults.
 *
 * As elsewhere in the core, persistence sits behind a trait
 * (`ConfigManagerOperations`) so callers and tests can substitute storage.
 */
use crate::core::path_utils;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_APP_NAME: &str = "FileConverter";
const CONFIG_FILENAME: &str = "diagnostics_config.json";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoProjectDirectory,
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Configuration file format error: {e}"),
            ConfigError::NoProjectDirectory => {
                write!(f, "Could not determine project directory for configuration")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub app_name: String,
    // Sessions are created here instead of the per-user data directory.
    pub root_override: Option<PathBuf>,
    pub mirror_console: bool,
    pub show_error_dialogs: bool,
    // 0 disables debouncing.
    pub error_dialog_debounce_ms: u64,
    pub log_level: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        DiagnosticsConfig {
            app_name: DEFAULT_APP_NAME.to_string(),
            root_override: None,
            mirror_console: true,
            show_error_dialogs: true,
            error_dialog_debounce_ms: 0,
            log_level: "info".to_string(),
        }
    }
}

impl DiagnosticsConfig {
    pub fn error_dialog_debounce(&self) -> Duration {
        Duration::from_millis(self.error_dialog_debounce_ms)
    }

    /*
     * Level for the crate's own `log` output. Unknown names fall back to Info
     * rather than failing startup over a typo.
     */
    pub fn level_filter(&self) -> log::LevelFilter {
        log::LevelFilter::from_str(self.log_level.trim()).unwrap_or_else(|_| {
            log::warn!(
                "DiagnosticsConfig: Unknown log level '{}', using info",
                self.log_level
            );
            log::LevelFilter::Info
        })
    }

    // Directory the session folders are created under.
    pub fn sessions_root(&self) -> Option<PathBuf> {
        match &self.root_override {
            Some(root) => Some(root.clone()),
            None => path_utils::get_user_data_dir(&self.app_name),
        }
    }
}

pub trait ConfigManagerOperations: Send + Sync {
    fn load_config(&self, app_name: &str) -> Result<DiagnosticsConfig>;
    fn save_config(&self, app_name: &str, config: &DiagnosticsConfig) -> Result<()>;
}

pub struct CoreConfigManager {
    config_dir_override: Option<PathBuf>,
}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {
            config_dir_override: None,
        }
    }

    // Stores the configuration file in `dir` instead of the per-user config directory.
    #[cfg(test)]
    pub fn with_config_dir(dir: impl Into<PathBuf>) -> Self {
        CoreConfigManager {
            config_dir_override: Some(dir.into()),
        }
    }

    fn config_file_path(&self, app_name: &str) -> Result<PathBuf> {
        let dir = match &self.config_dir_override {
            Some(dir) => dir.clone(),
            None => path_utils::get_base_app_config_local_dir(app_name)
                .ok_or(ConfigError::NoProjectDirectory)?,
        };
        Ok(dir.join(CONFIG_FILENAME))
    }

    fn read_config(file_path: &Path) -> Result<DiagnosticsConfig> {
        let reader = BufReader::new(File::open(file_path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    /*
     * Loads the diagnostics configuration for `app_name`. A missing file
     * yields the defaults with `app_name` filled in; a malformed file is an
     * error so the caller can decide whether to fall back.
     */
    fn load_config(&self, app_name: &str) -> Result<DiagnosticsConfig> {
        log::trace!("CoreConfigManager: Loading diagnostics config for app '{app_name}'");
        let file_path = self.config_file_path(app_name)?;

        if !file_path.exists() {
            log::debug!("CoreConfigManager: Config file {file_path:?} does not exist, using defaults.");
            return Ok(DiagnosticsConfig {
                app_name: app_name.to_string(),
                ..DiagnosticsConfig::default()
            });
        }

        let config = Self::read_config(&file_path)?;
        log::debug!("CoreConfigManager: Loaded diagnostics config from {file_path:?}.");
        Ok(config)
    }

    fn save_config(&self, app_name: &str, config: &DiagnosticsConfig) -> Result<()> {
        log::trace!("CoreConfigManager: Saving diagnostics config for app '{app_name}'");
        let file_path = self.config_file_path(app_name)?;

        let mut writer = BufWriter::new(File::create(&file_path)?);
        serde_json::to_writer_pretty(&mut writer, config)?;
        writer.flush()?;
        log::debug!("CoreConfigManager: Saved diagnostics config to {file_path:?}.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_missing_file_returns_defaults() {
        // Arrange
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path());

        // Act
        let config = manager.load_config("AnyApp").unwrap();

        // Assert
        assert_eq!(config.app_name, "AnyApp");
        assert!(config.mirror_console);
        assert!(config.show_error_dialogs);
        assert_eq!(config.error_dialog_debounce_ms, 0);
        assert_eq!(config.root_override, None);
    }

    #[test]
    fn test_save_and_load_config_round_trip() {
        // Arrange
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path());
        let config = DiagnosticsConfig {
            app_name: "AnyApp".to_string(),
            root_override: Some(PathBuf::from("/tmp/diag")),
            mirror_console: false,
            show_error_dialogs: false,
            error_dialog_debounce_ms: 1500,
            log_level: "debug".to_string(),
        };

        // Act
        manager.save_config("AnyApp", &config).unwrap();
        let loaded = manager.load_config("AnyApp").unwrap();

        // Assert
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{ "mirror_console": false }"#).unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path());

        let config = manager.load_config("AnyApp").unwrap();

        assert!(!config.mirror_console);
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
        assert!(config.show_error_dialogs);
    }

    #[test]
    fn test_malformed_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "{ not json").unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path());

        let result = manager.load_config("AnyApp");

        assert!(matches!(result, Err(ConfigError::Serde(_))));
    }

    #[test]
    fn test_level_filter_parses_and_falls_back() {
        let mut config = DiagnosticsConfig::default();
        config.log_level = "Trace".to_string();
        assert_eq!(config.level_filter(), log::LevelFilter::Trace);

        config.log_level = "loud".to_string();
        assert_eq!(config.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_sessions_root_prefers_override() {
        let config = DiagnosticsConfig {
            root_override: Some(PathBuf::from("/srv/diag")),
            ..DiagnosticsConfig::default()
        };
        assert_eq!(config.sessions_root(), Some(PathBuf::from("/srv/diag")));
    }
}
