//! Service configuration.
//!
//! Configuration is stored in TOML format at
//! `~/.config/coffee-catalog/config.toml` (or XDG equivalent). A missing file
//! yields the defaults; command-line flags override whatever the file says.
//!
//! # Example Configuration
//!
//! ```toml
//! bind = "0.0.0.0:5000"        # IP:port or host:port
//! backend = "sqlite"
//! recipes_path = "/srv/coffee/recipes.json"
//! db_path = "/srv/coffee/recipes.db"
//! images_dir = "/srv/coffee/images"
//! reload_on_start = true
//! ```

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Which store backs the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Read the JSON recipe document directly.
    #[default]
    Document,
    /// Read from the relational schema (optionally reloaded from the document first).
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address for `serve`.
    pub bind: String,
    pub backend: Backend,
    /// JSON recipe document.
    pub recipes_path: PathBuf,
    /// SQLite database used by the `sqlite` backend.
    pub db_path: PathBuf,
    /// Root of `coffees/` and `cups/` image trees.
    pub images_dir: PathBuf,
    /// Repopulate the database from the document before serving.
    pub reload_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".into(),
            backend: Backend::Document,
            recipes_path: PathBuf::from("recipes.json"),
            db_path: default_db_path(),
            images_dir: PathBuf::from("images"),
            reload_on_start: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns the defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the default configuration file path.
    ///
    /// Uses XDG conventions:
    /// - Primary: `$XDG_CONFIG_HOME/coffee-catalog/config.toml`
    /// - Fallback: platform-specific config dir
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config)
                .join("coffee-catalog")
                .join("config.toml"));
        }

        dirs::config_dir()
            .map(|p| p.join("coffee-catalog").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        for (field, path) in [
            ("recipes_path", &self.recipes_path),
            ("db_path", &self.db_path),
            ("images_dir", &self.images_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("{field} cannot be empty")));
            }
        }

        Ok(())
    }

    /// Resolve `bind` the way the listener will, so `host:port` names work.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let invalid = |reason: String| {
            ConfigError::Validation(format!("Invalid bind address '{}': {reason}", self.bind))
        };
        self.bind
            .to_socket_addrs()
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("resolved to no addresses".into()))
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("coffee-catalog"))
        .unwrap_or_default()
        .join("recipes.db")
}
