//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration lives in a small TOML file. Everything that can
//! change while the service runs (selected device, lineup) lives in the
//! database instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default HTTP port for walkup-server
pub const DEFAULT_PORT: u16 = 5731;

/// Default upper bound on a single playback dispatch
pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 10_000;

/// Name of the SQLite database file inside the root folder
pub const DATABASE_FILE_NAME: &str = "walkup.db";

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "WALKUP_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML
///
/// Cannot change while running. Restart to pick up edits.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path; defaults to `<root_folder>/walkup.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout applied to every playback dispatch, in milliseconds
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub spotify: SpotifySettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Spotify application credentials and endpoints
///
/// Every field is optional in the file. Environment variables override
/// whatever the file provides, see [`SpotifySettings::with_env_overrides`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifySettings {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Override for `https://api.spotify.com` (used by tests)
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Override for `https://accounts.spotify.com` (used by tests)
    #[serde(default)]
    pub accounts_base_url: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_dispatch_timeout_ms() -> u64 {
    DEFAULT_DISPATCH_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            port: default_port(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            logging: LoggingConfig::default(),
            spotify: SpotifySettings::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Database path for a resolved root folder
    ///
    /// An explicit `database_path` wins; relative paths are taken relative
    /// to the root folder.
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        match &self.database_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => root_folder.join(path),
            None => root_folder.join(DATABASE_FILE_NAME),
        }
    }
}

impl SpotifySettings {
    /// Apply `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET` and
    /// `SPOTIFY_REDIRECT_URI` on top of the file values
    pub fn with_env_overrides(mut self) -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(v) = read("SPOTIFY_CLIENT_ID") {
            self.client_id = Some(v);
        }
        if let Some(v) = read("SPOTIFY_CLIENT_SECRET") {
            self.client_secret = Some(v);
        }
        if let Some(v) = read("SPOTIFY_REDIRECT_URI") {
            self.redirect_uri = Some(v);
        }
        self
    }
}

/// Load the bootstrap TOML file
///
/// With an explicit path the file must exist. Without one, the platform
/// config locations are searched and built-in defaults are used when
/// nothing is found.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_file() {
            Some(path) => path,
            None => {
                debug!("No config file found, using built-in defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config = TomlConfig::from_toml_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Root folder resolution priority:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// First existing config file for the platform
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("walkup").join("walkup.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/walkup/walkup.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/walkup
        dirs::data_local_dir()
            .map(|d| d.join("walkup"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/walkup"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/walkup
        dirs::data_dir()
            .map(|d| d.join("walkup"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/walkup"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\walkup
        dirs::data_local_dir()
            .map(|d| d.join("walkup"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\walkup"))
    } else {
        PathBuf::from("./walkup_data")
    }
}
