//! Configuration management for rivulet-store.
//!
//! Configuration is read from `~/.config/rivulet/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app::StoreError;

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub backup: BackupConfig,
}

/// Whether the store outlives the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    #[default]
    Persistent,
    /// In-memory database and in-memory backups.
    Ephemeral,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub durability: Durability,
    /// Database file. Defaults to `<data dir>/rivulet/rivulet-store.db`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub local: Option<PathBuf>,
    pub sync: Option<PathBuf>,
}

impl Config {
    /// Configuration for a throwaway in-memory store.
    pub fn ephemeral() -> Self {
        Self {
            storage: StorageConfig {
                durability: Durability::Ephemeral,
                path: None,
            },
            ..Default::default()
        }
    }

    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/rivulet/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("rivulet").join("config.toml"))
    }

    fn data_dir() -> Result<PathBuf, ConfigError> {
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("rivulet"))
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("rivulet-store.db")),
        }
    }

    pub fn local_backup_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.backup.local {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("backup-local.json")),
        }
    }

    pub fn sync_backup_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.backup.sync {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("backup-sync.json")),
        }
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# rivulet-store configuration

[storage]
# "persistent" keeps entries and feeds in an SQLite file.
# "ephemeral" keeps everything in memory for the lifetime of the process.
durability = "persistent"

# Database file (default: <data dir>/rivulet/rivulet-store.db)
# path = "/home/me/.local/share/rivulet/rivulet-store.db"

[backup]
# Feed list backups, restored when the database has no feeds.
# The local backup is tried before the synced one.
# local = "/home/me/.local/share/rivulet/backup-local.json"
# sync = "/home/me/Sync/rivulet/backup-sync.json"
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl From<ConfigError> for StoreError {
    fn from(e: ConfigError) -> Self {
        StoreError::Config(e.to_string())
    }
}
