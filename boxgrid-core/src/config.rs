//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/boxgrid/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/boxgrid/` (~/.config/boxgrid/)
//! - Data: `$XDG_DATA_HOME/boxgrid/` (~/.local/share/boxgrid/)
//! - State/Logs: `$XDG_STATE_HOME/boxgrid/` (~/.local/state/boxgrid/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Grid defaults
    #[serde(default)]
    pub grid: GridConfig,

    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Grid defaults
#[derive(Debug, Deserialize)]
pub struct GridConfig {
    /// Grid size used for users without a stored preference (16, 36, or 64)
    #[serde(default = "default_grid_size")]
    pub default_grid_size: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_grid_size: default_grid_size(),
        }
    }
}

fn default_grid_size() -> u32 {
    crate::types::DEFAULT_GRID_SIZE
}

/// Analytics configuration
#[derive(Debug, Deserialize)]
pub struct AnalyticsConfig {
    /// Trailing window for completion rates, in days
    #[serde(default = "default_completion_window_days")]
    pub completion_window_days: u32,

    /// Number of top activities to include in weekly reports
    #[serde(default = "default_top_activities_count")]
    pub top_activities_count: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            completion_window_days: default_completion_window_days(),
            top_activities_count: default_top_activities_count(),
        }
    }
}

fn default_completion_window_days() -> u32 {
    30
}

fn default_top_activities_count() -> usize {
    5
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if ![16, 36, 64].contains(&self.grid.default_grid_size) {
            return Err(Error::Config(format!(
                "grid.default_grid_size must be 16, 36, or 64 (got {})",
                self.grid.default_grid_size
            )));
        }
        if self.analytics.completion_window_days == 0 {
            return Err(Error::Config(
                "analytics.completion_window_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/boxgrid/config.toml` (~/.config/boxgrid/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("boxgrid").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/boxgrid/` (~/.local/share/boxgrid/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("boxgrid")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/boxgrid/` (~/.local/state/boxgrid/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("boxgrid")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/boxgrid/data.db` (~/.local/share/boxgrid/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/boxgrid/boxgrid.log` (~/.local/state/boxgrid/boxgrid.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("boxgrid.log")
    }
}
