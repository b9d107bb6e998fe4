//! Dynamic workers configuration
//!
//! Supports user-level and explicit configuration files with merge semantics.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. Environment variables (DYNWORKER_*)
//! 2. Explicit file (--config)
//! 3. User-level (~/.config/dynamic-workers/config.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use dynamic_workers::util::config::load_user_config;
//!
//! let config = load_user_config().unwrap();
//! assert!(config.stack_size > 0);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::logger::LogLevel;

/// Environment variable overriding `max_workers`
pub const ENV_MAX_WORKERS: &str = "DYNWORKER_MAX_WORKERS";
/// Environment variable overriding `stack_size`
pub const ENV_STACK_SIZE: &str = "DYNWORKER_STACK_SIZE";
/// Environment variable overriding `log_level`
pub const ENV_LOG: &str = "DYNWORKER_LOG";

/// Runtime configuration for the worker manager and its host threads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Upper bound on simultaneously live workers; `None` means unbounded
    #[serde(default)]
    pub max_workers: Option<usize>,
    /// Stack size of each worker thread in bytes
    #[serde(default = "default_stack_size")]
    pub stack_size: usize,
    /// Prefix for worker thread names
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// Maximum nested script call depth inside a worker
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
    /// Default time the CLI waits for worker replies
    #[serde(default = "default_wait_ms")]
    pub default_wait_ms: u64,
    /// Log level name (`debug`, `info`, `warn`, `error`)
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_stack_size() -> usize {
    8 * 1024 * 1024
}

fn default_thread_name_prefix() -> String {
    "dynworker".to_string()
}

fn default_max_call_depth() -> usize {
    256
}

fn default_wait_ms() -> u64 {
    5000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            stack_size: default_stack_size(),
            thread_name_prefix: default_thread_name_prefix(),
            max_call_depth: default_max_call_depth(),
            default_wait_ms: default_wait_ms(),
            log_level: None,
        }
    }
}

impl WorkerConfig {
    /// Resolved log level, falling back to INFO for missing or unknown names
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Apply `DYNWORKER_*` overrides from the process environment
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_with<F>(
        mut self,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_WORKERS) {
            let value = parse_env_usize(ENV_MAX_WORKERS, &raw)?;
            self.max_workers = if value == 0 { None } else { Some(value) };
        }
        if let Some(raw) = lookup(ENV_STACK_SIZE) {
            self.stack_size = parse_env_usize(ENV_STACK_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG) {
            self.log_level = Some(raw);
        }
        Ok(self)
    }
}

fn parse_env_usize(
    key: &str,
    raw: &str,
) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("dynamic-workers"));
    }

    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("dynamic-workers"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("dynamic-workers"));
    }

    None
}

/// Get the user config file path (~/.config/dynamic-workers/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load a configuration file
pub fn load_from_path(path: &Path) -> Result<WorkerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Load user-level configuration
/// Returns default config if file doesn't exist
pub fn load_user_config() -> Result<WorkerConfig, ConfigError> {
    match get_config_path() {
        Some(path) if path.exists() => load_from_path(&path),
        _ => Ok(WorkerConfig::default()),
    }
}

/// Resolve the effective configuration: explicit file or user file, then environment
pub fn load(explicit: Option<&Path>) -> Result<WorkerConfig, ConfigError> {
    let config = match explicit {
        Some(path) => load_from_path(path)?,
        None => load_user_config()?,
    };
    config.apply_env()
}

/// Save configuration to a file, creating parent directories
pub fn save_to_path(
    config: &WorkerConfig,
    path: &Path,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(ConfigError::Io)?;
        }
    }

    let content = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    fs::write(path, content).map_err(ConfigError::Io)?;

    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[source] toml::de::Error),
    #[error("Config serialize error: {0}")]
    Serialize(#[source] toml::ser::Error),
    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },
}
