//! AniVault: backup lifecycle manager for AniList collections.
//!
//! Fetches a user's anime and manga lists, packs them into validated zip
//! archives alongside statistics and MyAnimeList-compatible XML exports, and
//! manages those archives over time.
//!
//! # Architecture
//!
//! - **Source**: [`source::CollectionSource`], implemented over AniList by
//!   the `anivault-anilist` crate
//! - **Backup**: staging, two-pass validation and atomic finalization
//!   ([`backup::BackupOrchestrator`])
//! - **Retention**: keep-N pruning and deletion ([`backup::RetentionManager`])
//! - **Scheduler**: one cancellable background task ([`scheduler::BackupScheduler`])
//! - **Journal and events**: a bounded operation log plus a live event feed
//!   ([`journal::LogJournal`], [`events::EventNotifier`])
//! - **Server**: JSON/SSE routes over a [`Vault`] ([`server`])

pub mod archive;
pub mod backup;
pub mod config;
pub mod error;
pub mod events;
pub mod journal;
pub mod latest;
pub mod mal_export;
pub mod persist;
pub mod scheduler;
pub mod server;
pub mod source;
pub mod stats;
pub mod vault;
pub mod vault_dirs;

pub use archive::{ArchiveMetadata, ArchiveStore, ArchiveSummary};
pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use events::{EventNotifier, VaultEvent};
pub use journal::{LogEntry, LogJournal};
pub use latest::LatestStats;
pub use scheduler::{Schedule, ScheduleStatus};
pub use server::VaultServer;
pub use source::CollectionSource;
pub use stats::{ArchiveStats, CollectionStats};
pub use vault::Vault;
pub use vault_dirs::VaultPaths;
