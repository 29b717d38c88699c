//! Bootstrap configuration loading
//!
//! Settings come from four sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`BIRDEX_*`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! Command-line and environment values are collected by the binary (clap
//! reads both) and handed in as [`ConfigOverrides`]; this module owns the
//! TOML layer and the defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BIRDEX_CONFIG";

/// Image extensions accepted by the scanner unless configured otherwise
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "raw", "arw", "cr2", "nef"];

/// Bootstrap configuration loaded from TOML
///
/// Every field has a default, so an empty file (or no file at all) is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Species catalog (JSON rows) loaded at startup
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Interface the HTTP server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Display name of the taxonomy root node
    #[serde(default = "default_root_name")]
    pub root_name: String,

    /// Scanner tuning
    #[serde(default)]
    pub scan: ScanSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scanner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Accepted file extensions, compared case-insensitively, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Worker threads for multi-root scans (0 = available parallelism)
    #[serde(default)]
    pub workers: usize,

    /// Scanned-file interval between progress reports
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_root_name() -> String {
    "World Birds".to_string()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_progress_interval() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            host: default_host(),
            port: default_port(),
            root_name: default_root_name(),
            scan: ScanSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            workers: 0,
            progress_interval: default_progress_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from a TOML file
    ///
    /// A missing file is not an error: a warning is logged and defaults are
    /// returned. A file that exists but cannot be read or parsed is.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply command-line / environment overrides on top of the TOML values
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(catalog) = overrides.catalog_path {
            self.catalog_path = Some(catalog);
        }
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Locate the configuration file
///
/// Priority: explicit path → `BIRDEX_CONFIG` → platform config directory
/// (`~/.config/birdex/config.toml` on Linux). Returns `None` when no
/// candidate can be determined.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("birdex").join("config.toml"))
}

/// Resolve and load configuration in one step
pub fn load_config(cli_config: Option<&Path>, overrides: ConfigOverrides) -> Result<TomlConfig> {
    let config = match resolve_config_path(cli_config) {
        Some(path) => TomlConfig::load(&path)?,
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            TomlConfig::default()
        }
    };
    Ok(config.apply_overrides(overrides))
}
