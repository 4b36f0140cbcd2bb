//! Archive creation pipeline.
//!
//! fetch → compute → stage → validate → pack → validate → finalize → publish,
//! strictly in that order. Only the rename in the finalize step makes an
//! archive visible, and it happens under the archive lock together with the
//! latest-stats update.

use super::ArchiveLock;
use super::staging::{PendingArchive, StagingArea};
use crate::archive::{
    self, ArchiveMetadata, ArchiveStore, MEMBERS, META_JSON, RawEnvelope, STATS_TXT,
};
use crate::error::{Result, VaultError};
use crate::events::{EventNotifier, VaultEvent};
use crate::journal::LogJournal;
use crate::latest::{LatestStats, LatestStatsCache};
use crate::mal_export::format_export;
use crate::source::CollectionSource;
use crate::stats::{ArchiveStats, render_summary};
use anivault_anilist::{CollectionDocument, MediaKind};
use chrono::{DateTime, Duration, DurationRound, Local, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Builds archives.
pub struct BackupOrchestrator {
    source: Arc<dyn CollectionSource>,
    store: ArchiveStore,
    latest: LatestStatsCache,
    journal: Arc<LogJournal>,
    notifier: EventNotifier,
    lock: ArchiveLock,
    last_created: Mutex<Option<DateTime<Utc>>>,
}

impl BackupOrchestrator {
    /// Wire an orchestrator to its collaborators.
    pub fn new(
        source: Arc<dyn CollectionSource>,
        store: ArchiveStore,
        latest: LatestStatsCache,
        journal: Arc<LogJournal>,
        notifier: EventNotifier,
        lock: ArchiveLock,
    ) -> Self {
        Self {
            source,
            store,
            latest,
            journal,
            notifier,
            lock,
            last_created: Mutex::new(None),
        }
    }

    /// Create, validate and publish a new archive for `owner_id`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidRequest`] if `owner_id` cannot name an archive.
    /// - [`VaultError::Fetch`] if the owner is unknown or the source fails.
    /// - [`VaultError::Validation`] if a member is missing, empty or corrupt
    ///   before or after packing.
    /// - [`VaultError::Storage`] / [`VaultError::Io`] on disk failures.
    ///
    /// Every failure is journaled. No staging directory or partial archive
    /// survives a failed call.
    pub async fn create_archive(&self, owner_id: &str) -> Result<ArchiveMetadata> {
        self.journal
            .append(format!("Attempting to create backup for user: {owner_id}"), true);

        match self.run(owner_id).await {
            Ok(meta) => {
                self.journal.append(
                    format!("Successfully created backup for {owner_id}. ID: {}", meta.id),
                    true,
                );
                Ok(meta)
            }
            Err(e) => {
                tracing::error!(owner = owner_id, error = %e, "backup creation failed");
                self.journal
                    .append(format!("Backup creation failed for {owner_id}: {e}"), false);
                Err(e)
            }
        }
    }

    async fn run(&self, owner_id: &str) -> Result<ArchiveMetadata> {
        archive::check_owner_id(owner_id)?;
        let doc = self.source.fetch(owner_id).await?;
        let stats = ArchiveStats::compute(&doc, owner_id);

        let created_at = self.next_creation_time();
        let meta = ArchiveMetadata {
            id: archive::archive_id(owner_id, created_at),
            created_at,
            owner_id: owner_id.to_owned(),
            stats,
        };
        tracing::info!(owner = owner_id, archive_id = %meta.id, "building archive");

        let staging = StagingArea::create(self.store.dir(), &meta.id)?;
        let pending = PendingArchive::new(self.store.dir(), &meta.id);

        let built = self
            .stage(&staging, &doc, &meta)
            .and_then(|()| archive::validate_staging(staging.path()))
            .and_then(|()| pack(staging.path(), pending.path()))
            .and_then(|()| archive::validate_packed(pending.path()));

        // Staging goes away whatever happened above.
        let cleanup = staging.remove();
        built?;
        cleanup?;

        {
            let _guard = self.lock.lock().await;
            pending.finalize(&self.store.path_for(&meta.id))?;
            if let Err(e) = self.latest.save(&LatestStats::from(&meta)) {
                tracing::warn!(error = %e, "cannot persist latest stats");
                self.journal
                    .append(format!("Error saving latest stats: {e}"), false);
            }
        }

        self.notifier.publish(VaultEvent::BackupCreated(meta.clone()));
        Ok(meta)
    }

    /// Write all six members into `staging`.
    fn stage(
        &self,
        staging: &StagingArea,
        doc: &CollectionDocument,
        meta: &ArchiveMetadata,
    ) -> Result<()> {
        for &kind in MediaKind::all() {
            let entries = doc.entries(kind);

            let envelope = RawEnvelope {
                owner_id: meta.owner_id.clone(),
                kind,
                entries,
            };
            staging.write(archive::raw_member(kind), to_json(&envelope)?)?;

            let export = format_export(&envelope.entries, kind, &meta.owner_id);
            for skipped in &export.skipped {
                self.journal.append(
                    format!(
                        "Skipping {kind} entry for MAL XML: missing valid id for '{}' (mediaId: {:?}, idMal: {:?})",
                        skipped.title, skipped.media_id, skipped.id_mal
                    ),
                    false,
                );
            }
            staging.write(archive::export_member(kind), export.document)?;
        }

        let summary = render_summary(&meta.stats, &meta.owner_id, meta.created_at.with_timezone(&Local))
            .map_err(|e| VaultError::Storage(format!("cannot render stats: {e}")))?;
        staging.write(STATS_TXT, summary)?;
        staging.write(META_JSON, to_json(meta)?)?;
        Ok(())
    }

    /// Millisecond-resolution creation time, strictly after the previous one.
    fn next_creation_time(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = now.duration_trunc(Duration::milliseconds(1)).unwrap_or(now);
        let mut last = self.last_created.lock().unwrap_or_else(|e| e.into_inner());
        let next = match *last {
            Some(prev) if now <= prev => prev + Duration::milliseconds(1),
            _ => now,
        };
        *last = Some(next);
        next
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| VaultError::Storage(format!("cannot serialize: {e}")))
}

/// Deflate every member of `staging` into a new zip at `out`.
fn pack(staging: &Path, out: &Path) -> Result<()> {
    let file = File::create(out)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for name in MEMBERS {
        let contents = std::fs::read(staging.join(name))?;
        zip.start_file(name, options)?;
        zip.write_all(&contents)?;
    }

    let file = zip.finish()?;
    file.sync_all()?;
    Ok(())
}
