//! Configuration loading, validation, and management for SkillWatch.
//!
//! Loads configuration from `~/.skillwatch/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod environment;

pub use environment::{
    FUNCTION_NAME_VAR, FUNCTION_VERSION_VAR, LOG_STREAM_VAR, SERVERLESS_MARKER_VAR,
    detect_environment, detect_environment_with,
};

/// Largest breadcrumb trail a reporter may keep.
pub const MAX_BREADCRUMBS_LIMIT: usize = 1000;

/// The root configuration structure.
///
/// Maps directly to `~/.skillwatch/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Error reporter settings
    #[serde(default)]
    pub reporter: ReporterConfig,

    /// Diagnostic logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Whether hooks wait for the backend before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Await every capture; deterministic, used by tests and replays
    #[default]
    Await,
    /// Spawn captures that nothing downstream depends on
    Detached,
}

impl std::str::FromStr for CaptureMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "await" => Ok(Self::Await),
            "detached" => Ok(Self::Detached),
            other => Err(ConfigError::ValidationError(format!(
                "unknown capture mode '{other}' (expected 'await' or 'detached')"
            ))),
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Await => write!(f, "await"),
            Self::Detached => write!(f, "detached"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Deployment environment stamped on reports (e.g. "production")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Release identifier stamped on reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    /// Server name stamped on reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// Breadcrumbs kept per request; oldest are dropped first
    #[serde(default = "default_max_breadcrumbs")]
    pub max_breadcrumbs: usize,

    #[serde(default)]
    pub capture_mode: CaptureMode,

    /// Backend client: "log" or "memory"
    #[serde(default = "default_client")]
    pub client: String,
}

fn default_max_breadcrumbs() -> usize {
    100
}
fn default_client() -> String {
    "log".into()
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            environment: None,
            release: None,
            server_name: None,
            max_breadcrumbs: default_max_breadcrumbs(),
            capture_mode: CaptureMode::default(),
            client: default_client(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.skillwatch/config.toml).
    ///
    /// Environment variables override the file:
    /// - `SKILLWATCH_ENVIRONMENT`
    /// - `SKILLWATCH_RELEASE`
    /// - `SKILLWATCH_CAPTURE_MODE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key-value lookup (the process environment in
    /// production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(environment) = lookup("SKILLWATCH_ENVIRONMENT") {
            self.reporter.environment = Some(environment);
        }

        if let Some(release) = lookup("SKILLWATCH_RELEASE") {
            self.reporter.release = Some(release);
        }

        if let Some(mode) = lookup("SKILLWATCH_CAPTURE_MODE") {
            self.reporter.capture_mode = mode.parse()?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".skillwatch")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.reporter.max_breadcrumbs == 0 || self.reporter.max_breadcrumbs > MAX_BREADCRUMBS_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "reporter.max_breadcrumbs must be between 1 and {MAX_BREADCRUMBS_LIMIT}"
            )));
        }

        if !matches!(self.reporter.client.as_str(), "log" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "reporter.client must be 'log' or 'memory', got '{}'",
                self.reporter.client
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
