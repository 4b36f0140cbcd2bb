//! The object the request layer talks to.

use crate::archive::{ArchiveMetadata, ArchiveStore, ArchiveSummary};
use crate::backup::{ArchiveLock, BackupOrchestrator, RetentionManager};
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::events::{EventNotifier, VaultEvent};
use crate::journal::{LogEntry, LogJournal};
use crate::latest::{LatestStats, LatestStatsCache};
use crate::scheduler::{BackupScheduler, Schedule, ScheduleStatus, ScheduleStore};
use crate::source::CollectionSource;
use crate::stats::ArchiveStats;
use crate::vault_dirs::VaultPaths;
use anivault_anilist::AniListClient;
use futures_util::stream::Stream;
use std::sync::Arc;
use std::time::Duration;

/// Prefix for journal entries submitted by clients.
pub const CLIENT_LOG_PREFIX: &str = "[CLIENT] ";

/// Backup lifecycle manager.
///
/// Wires the journal, event notifier, orchestrator, retention manager and
/// scheduler around one data directory.
pub struct Vault {
    paths: VaultPaths,
    store: ArchiveStore,
    latest: LatestStatsCache,
    journal: Arc<LogJournal>,
    notifier: EventNotifier,
    orchestrator: Arc<BackupOrchestrator>,
    retention: Arc<RetentionManager>,
    scheduler: BackupScheduler,
}

impl Vault {
    /// Build a vault over `paths` using `source` for collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the data directories
    /// cannot be created.
    pub fn new(
        config: &VaultConfig,
        paths: VaultPaths,
        source: Arc<dyn CollectionSource>,
    ) -> Result<Self> {
        config.validate()?;
        paths.ensure()?;

        let notifier = EventNotifier::new(
            config.events.channel_capacity,
            Duration::from_secs(config.events.keep_alive_secs),
        );
        let journal = Arc::new(LogJournal::new(
            paths.journal_file(),
            config.journal.max_entries,
            notifier.clone(),
        ));
        let store = ArchiveStore::new(paths.backups_dir());
        let latest = LatestStatsCache::new(paths.latest_stats_file());
        let lock = ArchiveLock::default();

        let orchestrator = Arc::new(BackupOrchestrator::new(
            source,
            store.clone(),
            latest.clone(),
            Arc::clone(&journal),
            notifier.clone(),
            Arc::clone(&lock),
        ));
        let retention = Arc::new(RetentionManager::new(
            store.clone(),
            latest.clone(),
            Arc::clone(&journal),
            notifier.clone(),
            lock,
        ));
        let scheduler = BackupScheduler::new(
            Arc::clone(&orchestrator),
            Arc::clone(&retention),
            ScheduleStore::new(paths.schedule_file(), Arc::clone(&journal)),
            Arc::clone(&journal),
            &config.scheduler,
        );

        tracing::info!(data_dir = %paths.root().display(), "vault ready");
        Ok(Self {
            paths,
            store,
            latest,
            journal,
            notifier,
            orchestrator,
            retention,
            scheduler,
        })
    }

    /// Build a vault that fetches from AniList, rooted at the configured
    /// data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the AniList client cannot be built or
    /// [`Vault::new`] fails.
    pub fn from_config(config: &VaultConfig) -> Result<Self> {
        let client = AniListClient::new(config.source.to_source_config())
            .map_err(|e| VaultError::Config(e.to_string()))?;
        let paths = VaultPaths::new(config.storage.resolve());
        Self::new(config, paths, Arc::new(client))
    }

    /// Filesystem layout in use.
    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    /// Operation journal.
    pub fn journal(&self) -> &LogJournal {
        &self.journal
    }

    /// Event hub.
    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    /// Background task owner.
    pub fn scheduler(&self) -> &BackupScheduler {
        &self.scheduler
    }

    /// Statistics of the newest archive, if any.
    pub fn latest_stats(&self) -> Option<LatestStats> {
        self.latest.load()
    }

    /// Live event stream for one observer.
    pub fn subscribe(&self) -> impl Stream<Item = VaultEvent> + Send + use<> {
        self.notifier.subscribe()
    }

    /// Create an archive now.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidRequest`] for an empty owner, otherwise the
    /// orchestrator's error.
    pub async fn create_backup(&self, owner_id: &str) -> Result<ArchiveMetadata> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(self.reject(
                "Manual backup",
                VaultError::InvalidRequest("username is required".into()),
            ));
        }
        self.journal
            .append(format!("Manual backup initiated for user: {owner_id}"), true);
        self.orchestrator
            .create_archive(owner_id)
            .await
            .map_err(|e| self.reject(&format!("Manual backup for user '{owner_id}'"), e))
    }

    /// Start (or replace) the schedule.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidRequest`] for unrunnable values.
    pub async fn start_schedule(
        &self,
        owner_id: &str,
        keep_last: u32,
        interval_hours: f64,
    ) -> Result<Schedule> {
        let schedule = Schedule::new(owner_id, keep_last, interval_hours)
            .map_err(|e| self.reject("Auto-backup start", e))?;
        self.scheduler.start(schedule).await
    }

    /// Stop the schedule. Returns `false` if none was running.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted schedule cannot be removed.
    pub async fn stop_schedule(&self) -> Result<bool> {
        self.scheduler.stop().await
    }

    /// Scheduler state.
    pub async fn schedule_status(&self) -> ScheduleStatus {
        self.scheduler.status().await
    }

    /// Resume a persisted schedule. Call once at startup.
    pub async fn resume_schedule(&self) -> bool {
        self.scheduler.resume_from_store().await
    }

    /// Stop the background task, keeping the persisted schedule.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    /// Archives, newest first, optionally for one owner.
    ///
    /// Unreadable archives are journaled and left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the backups directory cannot be read.
    pub fn list_backups(&self, owner_id: Option<&str>) -> Result<Vec<ArchiveSummary>> {
        let owner_id = owner_id.map(str::trim).filter(|o| !o.is_empty());
        let listing = self
            .store
            .scan(owner_id)
            .map_err(|e| self.reject("Listing backups", e))?;
        for problem in listing.problems {
            self.journal.append(problem, false);
        }
        Ok(listing.archives.iter().map(ArchiveMetadata::summary).collect())
    }

    /// Statistics stored in one archive.
    ///
    /// # Errors
    ///
    /// `InvalidRequest`, `NotFound`, or `Validation` for a corrupt archive.
    pub fn backup_stats(&self, id: &str) -> Result<ArchiveStats> {
        self.store
            .stats(id)
            .map_err(|e| self.reject(&format!("Getting stats for backup {id}"), e))
    }

    /// Archive bytes for download.
    ///
    /// # Errors
    ///
    /// `InvalidRequest`, `NotFound`, or an I/O error.
    pub fn download_backup(&self, id: &str) -> Result<Vec<u8>> {
        self.store
            .read_bytes(id)
            .map_err(|e| self.reject(&format!("Downloading backup {id}"), e))
    }

    /// Delete one archive and recompute the latest stats.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` or `NotFound`.
    pub async fn delete_backup(&self, id: &str) -> Result<()> {
        self.retention
            .delete(id)
            .await
            .map_err(|e| self.reject(&format!("Deleting backup {id}"), e))
    }

    /// Journal, oldest first.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.journal.list()
    }

    /// Append a client-originated journal entry.
    pub fn client_log(&self, message: &str, success: bool) -> LogEntry {
        self.journal
            .append(format!("{CLIENT_LOG_PREFIX}{message}"), success)
    }

    /// Journal a failed manual operation and hand the error back.
    fn reject(&self, context: &str, err: VaultError) -> VaultError {
        self.journal.append(format!("{context} failed: {err}"), false);
        err
    }
}
