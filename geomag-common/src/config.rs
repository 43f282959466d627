//! Configuration loading and source root resolution
//!
//! Bootstrap settings come from an optional TOML file. Each setting is
//! resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: defaults are used and a warning
//! is logged.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable overriding the data source root
pub const SOURCE_ROOT_ENV: &str = "GEOMAG_SOURCE_ROOT";

/// Public INTERMAGNET data tree
pub const DEFAULT_SOURCE_ROOT: &str = "http://origin1.intermagnet.org/data";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Base URI (or local directory) of the data tree
    #[serde(default)]
    pub source_root: Option<String>,

    /// Default station code
    #[serde(default)]
    pub station: Option<String>,

    /// Default sampling period ("minute", "second", 60 or 1)
    #[serde(default)]
    pub sampling: Option<String>,

    /// Default data type ("all" or a single data type)
    #[serde(default)]
    pub data_type: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP client configuration (optional)
    #[serde(default)]
    pub http: HttpConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("geomag/{}", env!("CARGO_PKG_VERSION"))
}

impl TomlConfig {
    /// Load configuration from `path`
    ///
    /// Missing file → defaults with a warning. Unreadable or malformed
    /// file → [`Error::Config`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from the platform default location, falling back to defaults
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Platform config file location (`~/.config/geomag/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("geomag").join("config.toml"))
}

/// Resolve the data source root
///
/// CLI argument → `GEOMAG_SOURCE_ROOT` → TOML → [`DEFAULT_SOURCE_ROOT`]
pub fn resolve_source_root(cli_arg: Option<&str>, config: &TomlConfig) -> String {
    // Priority 1: Command-line argument
    if let Some(root) = cli_arg.filter(|r| !r.trim().is_empty()) {
        return root.to_string();
    }

    // Priority 2: Environment variable
    if let Ok(root) = std::env::var(SOURCE_ROOT_ENV) {
        if !root.trim().is_empty() {
            return root;
        }
    }

    // Priority 3: TOML config file
    if let Some(root) = config.source_root.as_deref().filter(|r| !r.trim().is_empty()) {
        return root.to_string();
    }

    // Priority 4: Compiled default
    DEFAULT_SOURCE_ROOT.to_string()
}
