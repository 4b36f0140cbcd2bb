//! Configuration types for AniVault.
//!
//! Loaded from `config.toml`; every section falls back to its defaults so a
//! missing or partial file is always usable.

use crate::error::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VaultConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Data directory override.
    pub storage: StorageConfig,
    /// Remote collection source.
    pub source: SourceSection,
    /// Background scheduler timings.
    pub scheduler: SchedulerConfig,
    /// Event stream tuning.
    pub events: EventsConfig,
    /// Operational journal.
    pub journal: JournalConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5000,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Data root. `None` uses [`crate::vault_dirs::data_dir`].
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Effective data root.
    pub fn resolve(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(crate::vault_dirs::data_dir)
    }
}

/// Remote source configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceSection {
    /// GraphQL endpoint.
    pub api_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            api_url: anivault_anilist::config::DEFAULT_API_URL.to_owned(),
            timeout_secs: 30,
        }
    }
}

impl SourceSection {
    /// Client configuration for the AniList crate.
    pub fn to_source_config(&self) -> anivault_anilist::SourceConfig {
        anivault_anilist::SourceConfig {
            timeout_seconds: self.timeout_secs,
            ..anivault_anilist::SourceConfig::default().with_api_url(self.api_url.clone())
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How long `stop()` waits for the background task before giving up.
    pub stop_timeout_secs: u64,
    /// Recheck period while the task has no schedule.
    pub idle_recheck_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: 10,
            idle_recheck_secs: 300,
        }
    }
}

impl SchedulerConfig {
    /// Stop timeout as a [`Duration`].
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Idle recheck period as a [`Duration`].
    pub fn idle_recheck(&self) -> Duration {
        Duration::from_secs(self.idle_recheck_secs)
    }
}

/// Event stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EventsConfig {
    /// Quiet period after which an observer receives a keep-alive.
    pub keep_alive_secs: u64,
    /// Per-observer buffer before a slow observer starts lagging.
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: 25,
            channel_capacity: 256,
        }
    }
}

/// Journal configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JournalConfig {
    /// Entries retained on disk.
    pub max_entries: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { max_entries: 100 }
    }
}

impl VaultConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| VaultError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error only if an existing file is unreadable or invalid.
    pub fn load_or_default(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| VaultError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config_dir>/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::vault_dirs::config_file()
    }

    /// Reject values that would make the service unusable.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(VaultError::Config("server.host must not be empty".into()));
        }
        if self.source.timeout_secs == 0 {
            return Err(VaultError::Config("source.timeout_secs must be > 0".into()));
        }
        if self.scheduler.idle_recheck_secs == 0 {
            return Err(VaultError::Config(
                "scheduler.idle_recheck_secs must be > 0".into(),
            ));
        }
        if self.events.keep_alive_secs == 0 {
            return Err(VaultError::Config("events.keep_alive_secs must be > 0".into()));
        }
        if self.events.channel_capacity == 0 {
            return Err(VaultError::Config(
                "events.channel_capacity must be > 0".into(),
            ));
        }
        if self.journal.max_entries == 0 {
            return Err(VaultError::Config("journal.max_entries must be > 0".into()));
        }
        self.source
            .to_source_config()
            .validate()
            .map_err(|e| VaultError::Config(e.to_string()))
    }
}
