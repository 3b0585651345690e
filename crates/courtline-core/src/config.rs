//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/courtline/config.toml)
//! 3. Environment variables (COURTLINE_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::BackendKind;

/// Environment variable prefix
const ENV_PREFIX: &str = "COURTLINE";

/// Placeholder identity recorded in audit entries (there is no login)
pub const DEFAULT_USER_ID: &str = "current-user-id";
pub const DEFAULT_USER_NAME: &str = "Current User";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (SQLite db or collection files)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Storage backend
    #[serde(default)]
    pub backend: BackendKind,

    /// User id written to audit entries
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// User display name written to audit entries
    #[serde(default = "default_user_name")]
    pub user_name: String,

    /// Whether simulated integration calls pause like a real round-trip
    #[serde(default = "default_true")]
    pub simulate_latency: bool,

    /// Log file for the dashboard (defaults to `<data_dir>/debug.log`)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendKind::default(),
            user_id: default_user_id(),
            user_name: default_user_name(),
            simulate_latency: true,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (COURTLINE_DATA_DIR, COURTLINE_BACKEND, ...)
    /// 2. Config file (~/.config/courtline/config.toml or COURTLINE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit `--config` path when given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Configuration for an isolated data directory, ignoring file and env
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            simulate_latency: false,
            ..Self::default()
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_BACKEND", ENV_PREFIX)) {
            match val.parse() {
                Ok(kind) => self.backend = kind,
                Err(e) => tracing::warn!("Ignoring {}_BACKEND: {}", ENV_PREFIX, e),
            }
        }

        if let Ok(val) = std::env::var(format!("{}_USER_ID", ENV_PREFIX)) {
            if !val.is_empty() {
                self.user_id = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_USER_NAME", ENV_PREFIX)) {
            if !val.is_empty() {
                self.user_name = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_SIMULATE_LATENCY", ENV_PREFIX)) {
            self.simulate_latency = val.eq_ignore_ascii_case("true") || val == "1";
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with COURTLINE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courtline")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("courtline.db")
    }

    /// Get the directory holding per-collection JSON files
    pub fn collections_dir(&self) -> PathBuf {
        self.data_dir.join("collections")
    }

    /// Get the dashboard log file path
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("courtline")
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

fn default_user_name() -> String {
    DEFAULT_USER_NAME.to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    pub(crate) struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        pub(crate) fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    pub(crate) const ENV_VARS: &[&str] = &[
        "COURTLINE_DATA_DIR",
        "COURTLINE_BACKEND",
        "COURTLINE_USER_ID",
        "COURTLINE_USER_NAME",
        "COURTLINE_SIMULATE_LATENCY",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.user_id, DEFAULT_USER_ID);
        assert_eq!(config.user_name, DEFAULT_USER_NAME);
        assert!(config.simulate_latency);
        assert!(config.data_dir.ends_with("courtline"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config::for_data_dir("/srv/courtline");

        assert_eq!(config.sqlite_path(), PathBuf::from("/srv/courtline/courtline.db"));
        assert_eq!(
            config.collections_dir(),
            PathBuf::from("/srv/courtline/collections")
        );
        assert_eq!(config.log_path(), PathBuf::from("/srv/courtline/debug.log"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("COURTLINE_DATA_DIR", "/tmp/courtline-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/courtline-test"));
    }

    #[test]
    fn test_env_override_backend() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("COURTLINE_BACKEND", "json");
        config.apply_env_overrides();
        assert_eq!(config.backend, BackendKind::Json);

        // Unknown values are ignored
        env::set_var("COURTLINE_BACKEND", "postgres");
        config.apply_env_overrides();
        assert_eq!(config.backend, BackendKind::Json);
    }

    #[test]
    fn test_env_override_user_and_latency() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("COURTLINE_USER_ID", "clerk-7");
        env::set_var("COURTLINE_USER_NAME", "Court Clerk");
        env::set_var("COURTLINE_SIMULATE_LATENCY", "false");
        config.apply_env_overrides();

        assert_eq!(config.user_id, "clerk-7");
        assert_eq!(config.user_name, "Court Clerk");
        assert!(!config.simulate_latency);

        env::set_var("COURTLINE_SIMULATE_LATENCY", "1");
        config.apply_env_overrides();
        assert!(config.simulate_latency);
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/courtline"),
            backend: BackendKind::Json,
            user_id: "u1".to_string(),
            user_name: "User One".to_string(),
            simulate_latency: false,
            log_file: None,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("backend = \"json\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.backend, config.backend);
        assert_eq!(parsed.user_name, config.user_name);
        assert!(!parsed.simulate_latency);
    }

    #[test]
    fn test_load_from_str_fills_defaults() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_str(r#"data_dir = "/custom/data""#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.user_id, DEFAULT_USER_ID);
        assert!(config.simulate_latency);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("config.toml");

        let mut config = Config::for_data_dir(temp_dir.path().join("data"));
        config.user_name = "Judge Judy".to_string();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.user_name, "Judge Judy");
        assert!(loaded.data_dir.exists());
    }
}
