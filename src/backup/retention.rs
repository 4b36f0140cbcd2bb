//! Archive deletion: retention pruning and manual deletes.
//!
//! Both paths hold the archive lock across list-then-delete and the
//! latest-stats refresh that follows, so the cache always describes the
//! newest archive that is actually still on disk.

use super::ArchiveLock;
use crate::archive::{ArchiveStore, check_archive_id};
use crate::error::{Result, VaultError};
use crate::events::{EventNotifier, VaultEvent};
use crate::journal::LogJournal;
use crate::latest::{LatestStats, LatestStatsCache};
use std::sync::Arc;

/// Deletes archives and keeps the latest-stats cache consistent.
pub struct RetentionManager {
    store: ArchiveStore,
    latest: LatestStatsCache,
    journal: Arc<LogJournal>,
    notifier: EventNotifier,
    lock: ArchiveLock,
}

impl RetentionManager {
    /// Wire a retention manager to its collaborators.
    pub fn new(
        store: ArchiveStore,
        latest: LatestStatsCache,
        journal: Arc<LogJournal>,
        notifier: EventNotifier,
        lock: ArchiveLock,
    ) -> Self {
        Self {
            store,
            latest,
            journal,
            notifier,
            lock,
        }
    }

    /// Delete all but the newest `keep_last` archives of `owner_id`.
    ///
    /// Returns the ids actually deleted. An archive that vanished between
    /// listing and deletion is journaled as a failed deletion, not raised.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive directory cannot be scanned.
    pub async fn prune(&self, owner_id: &str, keep_last: usize) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;

        let listing = self.store.scan(Some(owner_id))?;
        for problem in &listing.problems {
            self.journal.append(problem.clone(), false);
        }

        // Listing is newest first; everything past `keep_last` is older.
        let excess: Vec<String> = listing
            .archives
            .iter()
            .skip(keep_last)
            .map(|m| m.id.clone())
            .collect();
        if excess.is_empty() {
            return Ok(Vec::new());
        }

        let mut deleted = Vec::with_capacity(excess.len());
        for id in excess {
            self.journal.append(
                format!("Retention: deleting old backup {id} for user {owner_id}"),
                true,
            );
            if self.delete_locked(&id) {
                deleted.push(id);
            }
        }
        tracing::info!(owner = owner_id, keep_last, deleted = deleted.len(), "pruned archives");

        self.refresh_latest_locked();
        Ok(deleted)
    }

    /// Delete one archive by id and recompute the latest-stats cache.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidRequest`] for a malformed id,
    /// [`VaultError::NotFound`] if no such archive exists.
    pub async fn delete(&self, id: &str) -> Result<()> {
        check_archive_id(id)?;
        let _guard = self.lock.lock().await;

        if !self.delete_locked(id) {
            return Err(VaultError::NotFound(format!("backup '{id}' not found")));
        }
        self.refresh_latest_locked();
        Ok(())
    }

    /// Remove one archive file. Journals the outcome and publishes
    /// `backup_deleted` on success. Caller holds the lock.
    fn delete_locked(&self, id: &str) -> bool {
        match self.store.remove(id) {
            Ok(true) => {
                self.journal.append(format!("Deleted backup {id}"), true);
                self.notifier.publish(VaultEvent::BackupDeleted { id: id.to_owned() });
                true
            }
            Ok(false) => {
                self.journal
                    .append(format!("Attempted to delete non-existent backup {id}"), false);
                false
            }
            Err(e) => {
                tracing::error!(archive_id = id, error = %e, "archive deletion failed");
                self.journal
                    .append(format!("Error deleting backup file {id}: {e}"), false);
                false
            }
        }
    }

    /// Point the latest-stats cache at the newest remaining archive, or
    /// clear it, and publish the result. Caller holds the lock.
    fn refresh_latest_locked(&self) {
        let newest = match self.store.scan(None) {
            Ok(listing) => listing.archives.into_iter().next(),
            Err(e) => {
                self.journal
                    .append(format!("Error updating latest stats after delete: {e}"), false);
                None
            }
        };

        let published = match newest {
            Some(meta) => {
                let stats = LatestStats::from(&meta);
                match self.latest.save(&stats) {
                    Ok(()) => Some(stats),
                    Err(e) => {
                        self.journal
                            .append(format!("Error updating latest stats after delete: {e}"), false);
                        self.clear_latest();
                        None
                    }
                }
            }
            None => {
                self.clear_latest();
                None
            }
        };
        self.notifier.publish(VaultEvent::LatestStatsUpdated(published));
    }

    fn clear_latest(&self) {
        if let Err(e) = self.latest.clear() {
            tracing::warn!(error = %e, "cannot clear latest stats");
        }
    }
}
