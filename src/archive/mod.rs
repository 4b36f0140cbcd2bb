//! Archive format: members, ids, metadata and the on-disk store.
//!
//! An archive is a zip with six members at its root. It only becomes
//! visible under `<id>.zip` once both validation passes have succeeded;
//! everything else in the backups directory (`*.zip.part`, `_TEMP_*`) is
//! ignored by listing.

pub mod store;
pub mod validate;

pub use store::{ArchiveStore, Listing};
pub use validate::{validate_packed, validate_staging};

use crate::error::{Result, VaultError};
use crate::stats::ArchiveStats;
use anivault_anilist::{MediaKind, MediaListEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw anime records.
pub const ANIME_JSON: &str = "anime.json";
/// Raw manga records.
pub const MANGA_JSON: &str = "manga.json";
/// Human-readable statistics.
pub const STATS_TXT: &str = "animemanga_stats.txt";
/// MAL export of the anime list.
pub const ANIME_XML: &str = "anime.xml";
/// MAL export of the manga list.
pub const MANGA_XML: &str = "manga.xml";
/// Metadata document.
pub const META_JSON: &str = "meta.json";

/// Every required member, in packing order.
pub const MEMBERS: [&str; 6] = [ANIME_JSON, MANGA_JSON, STATS_TXT, ANIME_XML, MANGA_XML, META_JSON];

/// Extension of a finalized archive.
pub const ARCHIVE_SUFFIX: &str = ".zip";
/// Extension of an archive that is still being packed or validated.
pub const PART_SUFFIX: &str = ".zip.part";
/// Prefix of staging directories.
pub const STAGING_PREFIX: &str = "_TEMP_";

/// Raw member name for a collection kind.
pub fn raw_member(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Anime => ANIME_JSON,
        MediaKind::Manga => MANGA_JSON,
    }
}

/// Export member name for a collection kind.
pub fn export_member(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Anime => ANIME_XML,
        MediaKind::Manga => MANGA_XML,
    }
}

/// Build an archive id from its owner and creation time.
pub fn archive_id(owner_id: &str, created_at: DateTime<Utc>) -> String {
    format!("{owner_id}_{}", created_at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Reject ids that could escape the backups directory.
///
/// # Errors
///
/// Returns [`VaultError::InvalidRequest`] for empty ids or ids containing a
/// path separator or `..`.
pub fn check_archive_id(id: &str) -> Result<()> {
    if id.is_empty() || !is_plain_component(id) {
        return Err(VaultError::InvalidRequest(format!("invalid archive id '{id}'")));
    }
    Ok(())
}

/// Reject owners whose archive ids would be refused by [`check_archive_id`]
/// or hidden from listing.
///
/// # Errors
///
/// Returns [`VaultError::InvalidRequest`] for empty owners, owners containing
/// a path separator or `..`, and owners starting with [`STAGING_PREFIX`].
pub fn check_owner_id(owner_id: &str) -> Result<()> {
    if let Some(reason) = owner_id_problem(owner_id) {
        return Err(VaultError::InvalidRequest(format!(
            "invalid username '{owner_id}': {reason}"
        )));
    }
    Ok(())
}

/// Why `owner_id` cannot name archives, if it cannot.
pub(crate) fn owner_id_problem(owner_id: &str) -> Option<&'static str> {
    if owner_id.is_empty() {
        Some("username is required")
    } else if !is_plain_component(owner_id) {
        Some("username must not contain '/', '\\' or '..'")
    } else if owner_id.starts_with(STAGING_PREFIX) {
        Some("username must not start with the staging prefix")
    } else {
        None
    }
}

fn is_plain_component(name: &str) -> bool {
    !(name.contains('/') || name.contains('\\') || name.contains(".."))
}

/// Metadata embedded in every archive as `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// `{owner}_{timestamp}`.
    pub id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Owner whose collection was captured.
    pub owner_id: String,
    /// Statistics computed at creation.
    pub stats: ArchiveStats,
}

impl ArchiveMetadata {
    /// Compact listing view.
    pub fn summary(&self) -> ArchiveSummary {
        ArchiveSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            owner_id: self.owner_id.clone(),
            content: format!(
                "{} Anime, {} Manga",
                self.stats.anime.total_entries, self.stats.manga.total_entries
            ),
        }
    }
}

/// One row of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    /// Archive id.
    pub id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Owner.
    pub owner_id: String,
    /// Entry counts, e.g. `"120 Anime, 40 Manga"`.
    pub content: String,
}

/// Raw-record member body.
///
/// Wrapping the entries keeps the member a non-empty JSON value even for an
/// owner with an empty list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEnvelope {
    /// Owner.
    pub owner_id: String,
    /// Collection kind.
    pub kind: MediaKind,
    /// Entries exactly as fetched.
    pub entries: Vec<MediaListEntry>,
}
