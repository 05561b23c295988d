//! Bootstrap configuration and root folder resolution
//!
//! Configuration is split in two tiers:
//! 1. **TOML bootstrap**: root folder, port, logging, parts-source credentials
//! 2. **Database runtime**: `settings` table (read by the services)
//!
//! A missing TOML file is not an error: the service starts with defaults and
//! logs a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LCM_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "lcm.db";

/// Default HTTP port of the enrichment service
pub const DEFAULT_PORT: u16 = 5731;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port (optional, defaults to [`DEFAULT_PORT`])
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// External parts-data source settings
    #[serde(default)]
    pub z2data: Z2DataSection,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// `[z2data]` table of the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Z2DataSection {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Platform config file location: `<config_dir>/lcm/<file_name>`
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lcm").join(file_name))
}

/// Load the bootstrap TOML config
///
/// A missing file yields defaults; an unreadable or malformed file is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Resolve the root folder
///
/// Priority: command-line argument, then `LCM_ROOT_FOLDER`, then TOML, then
/// the OS-dependent default.
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path.trim());
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lcm"))
        .unwrap_or_else(|| PathBuf::from("./lcm_data"))
}

/// Create the root folder if missing and return the database path inside it
pub fn ensure_root_folder(root_folder: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root_folder).map_err(|e| {
        Error::Config(format!(
            "Cannot create root folder {}: {}",
            root_folder.display(),
            e
        ))
    })?;
    Ok(root_folder.join(DATABASE_FILE))
}

/// Strip non-printable and non-ASCII characters from a credential, then trim
///
/// Keys pasted from dashboards regularly carry zero-width spaces or
/// trailing newlines that the remote side rejects as a bad key.
pub fn sanitize_credential(raw: &str) -> String {
    raw.chars()
        .filter(|c| (' '..='~').contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}
