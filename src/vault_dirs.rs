//! Centralized filesystem paths for AniVault.
//!
//! Uses the [`dirs`] crate for platform-appropriate defaults.
//!
//! # Directory Layout
//!
//! | Purpose | Path |
//! |---------|------|
//! | Schedule, journal, latest stats | `<data>/app_data/` |
//! | Finalized archives | `<data>/backups/*.zip` |
//! | Diagnostic tracing logs | `<data>/logs/` |
//! | `config.toml` | `<config>/` |
//!
//! # Environment Overrides
//!
//! - `ANIVAULT_DATA_DIR`: overrides [`data_dir`]
//! - `ANIVAULT_CONFIG_DIR`: overrides [`config_dir`]

use std::path::{Path, PathBuf};

/// Application data root directory.
///
/// Resolves to `dirs::data_dir()/anivault/` by default. Override with
/// the `ANIVAULT_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ANIVAULT_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("anivault"))
        .unwrap_or_else(|| PathBuf::from("/tmp/anivault-data"))
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/anivault/` by default. Override with
/// the `ANIVAULT_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ANIVAULT_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("anivault"))
        .unwrap_or_else(|| PathBuf::from("/tmp/anivault-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Every persisted location, derived from one data root.
///
/// Components receive a `VaultPaths` instead of calling the free functions
/// so tests can point the whole system at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    root: PathBuf,
}

impl VaultPaths {
    /// Paths rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Paths rooted at [`data_dir`].
    pub fn from_env() -> Self {
        Self::new(data_dir())
    }

    /// Data root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `app_data/`: small JSON state documents.
    pub fn app_data_dir(&self) -> PathBuf {
        self.root.join("app_data")
    }

    /// `backups/`: finalized archives and transient staging areas.
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// `logs/`: daily tracing files written by the binary.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Persisted schedule (`app_data/config.json`).
    pub fn schedule_file(&self) -> PathBuf {
        self.app_data_dir().join("config.json")
    }

    /// Operational journal (`app_data/logs.json`).
    pub fn journal_file(&self) -> PathBuf {
        self.app_data_dir().join("logs.json")
    }

    /// Latest stats cache (`app_data/latest_stats.json`).
    pub fn latest_stats_file(&self) -> PathBuf {
        self.app_data_dir().join("latest_stats.json")
    }

    /// Create `app_data/` and `backups/` if missing.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if either directory cannot be created.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.app_data_dir())?;
        std::fs::create_dir_all(self.backups_dir())?;
        Ok(())
    }
}
