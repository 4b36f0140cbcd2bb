//! "Latest stats" cache: the statistics of the newest archive across all owners.

use crate::archive::ArchiveMetadata;
use crate::error::Result;
use crate::stats::CollectionStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cached statistics of the most recently created archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestStats {
    /// Owner of the archive.
    pub owner_id: String,
    /// Archive the stats were taken from.
    pub archive_id: String,
    /// Creation time of that archive.
    pub last_updated: DateTime<Utc>,
    /// Anime statistics.
    pub anime: CollectionStats,
    /// Manga statistics.
    pub manga: CollectionStats,
}

impl From<&ArchiveMetadata> for LatestStats {
    fn from(meta: &ArchiveMetadata) -> Self {
        Self {
            owner_id: meta.owner_id.clone(),
            archive_id: meta.id.clone(),
            last_updated: meta.created_at,
            anime: meta.stats.anime.clone(),
            manga: meta.stats.manga.clone(),
        }
    }
}

/// `latest_stats.json` on disk.
#[derive(Debug, Clone)]
pub struct LatestStatsCache {
    path: PathBuf,
}

impl LatestStatsCache {
    /// Cache stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Current value. Missing or unreadable caches read as `None`.
    pub fn load(&self) -> Option<LatestStats> {
        match crate::persist::read_json(&self.path) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "latest stats cache unreadable");
                None
            }
        }
    }

    /// Replace the cached value.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, stats: &LatestStats) -> Result<()> {
        crate::persist::write_json(&self.path, stats)
    }

    /// Remove the cache file.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be removed.
    pub fn clear(&self) -> Result<()> {
        crate::persist::remove(&self.path).map(|_| ())
    }
}
