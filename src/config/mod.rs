//! Configuration module
//!
//! This module handles application configuration:
//! - `config.toml` - user-editable settings (port, baud, logging interval,
//!   export directory)
//! - `app_state.json` - session memory (last successful connection)
//!
//! Both live in the platform-appropriate data directory under
//! `dev.hxyulin.bmsmon-rs`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.bmsmon-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.bmsmon-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.bmsmon-rs\`
//!
//! Missing or malformed files fall back to defaults; configuration
//! problems never prevent the monitor from starting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MonitorError, Result};
use crate::types::DEFAULT_LOGGING_INTERVAL_SECS;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.bmsmon-rs";

/// Settings filename
pub const CONFIG_FILE: &str = "config.toml";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Default baud rate for BMS serial links
pub const DEFAULT_BAUD: u32 = 115_200;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        MonitorError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            MonitorError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the settings file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

// ==================== Settings ====================

/// Serial connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`; empty means "pick at runtime"
    pub port: String,
    /// Baud rate
    pub baud: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud: DEFAULT_BAUD,
        }
    }
}

/// Snapshot logging and export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum seconds between logged snapshot rows
    pub interval_secs: u64,
    /// Directory export files are written into
    pub export_dir: PathBuf,
    /// Also write tracing output to a rolling log file in the data dir
    pub log_to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_LOGGING_INTERVAL_SECS,
            export_dir: PathBuf::from("."),
            log_to_file: false,
        }
    }
}

/// Application configuration, persisted as TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from the default location, falling back to defaults on any
    /// problem
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| MonitorError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Save to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(&dir.join(CONFIG_FILE))
    }

    /// Save to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| MonitorError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

// ==================== App State ====================

/// Persistent session memory, persisted as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    /// Port of the last successful connection
    pub last_port: Option<String>,
    /// Baud of the last successful connection
    pub last_baud: Option<u32>,
}

impl AppState {
    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = app_state_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path)
            .map_err(MonitorError::from)
            .and_then(|text| {
                serde_json::from_str(&text)
                    .map_err(|e| MonitorError::Config(format!("Failed to parse app state: {}", e)))
            }) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load app state, using defaults");
                Self::default()
            }
        }
    }

    /// Remember a successful connection
    pub fn record_connection(&mut self, port: &str, baud: u32) {
        self.last_port = Some(port.to_string());
        self.last_baud = Some(baud);
    }

    /// Save to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| MonitorError::Config(format!("Failed to serialize app state: {}", e)))?;
        std::fs::write(dir.join(APP_STATE_FILE), text)?;
        Ok(())
    }
}
