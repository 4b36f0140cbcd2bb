//! Typed view of the AniList `MediaListCollection` response.
//!
//! Every field is optional: AniList returns `null` freely and a backup must
//! never fail because one entry lacks a title or a date.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two lists an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Anime list (`MediaListCollection`, type `ANIME`).
    Anime,
    /// Manga list (`MediaListCollection2`, type `MANGA`).
    Manga,
}

impl MediaKind {
    /// Lowercase identifier, also used as the archive member stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anime => "anime",
            Self::Manga => "manga",
        }
    }

    /// Capitalised label for human-readable output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Anime => "Anime",
            Self::Manga => "Manga",
        }
    }

    /// Both kinds, anime first.
    pub fn all() -> &'static [MediaKind] {
        &[Self::Anime, Self::Manga]
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The nested document returned by the collection query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionDocument {
    /// GraphQL `data` object.
    #[serde(default)]
    pub data: CollectionData,
}

/// Both aliased collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionData {
    /// Anime list.
    #[serde(rename = "MediaListCollection", default)]
    pub anime: Option<MediaListCollection>,
    /// Manga list (aliased in the query).
    #[serde(rename = "MediaListCollection2", default)]
    pub manga: Option<MediaListCollection>,
}

/// One media list collection, grouped by list name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaListCollection {
    /// Status groups ("Watching", "Completed", custom lists, ...).
    #[serde(default)]
    pub lists: Option<Vec<MediaListGroup>>,
}

/// A named group of entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaListGroup {
    /// Group name as shown on AniList.
    #[serde(default)]
    pub name: Option<String>,
    /// Entries in this group.
    #[serde(default)]
    pub entries: Option<Vec<MediaListEntry>>,
}

/// A single list entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaListEntry {
    /// AniList media id.
    #[serde(default)]
    pub media_id: Option<i64>,
    /// List status (`CURRENT`, `COMPLETED`, `PAUSED`, `DROPPED`, `PLANNING`, `REPEATING`).
    #[serde(default)]
    pub status: Option<String>,
    /// User score in the account's scoring format.
    #[serde(default)]
    pub score: Option<f64>,
    /// Episodes watched or chapters read.
    #[serde(default)]
    pub progress: Option<u32>,
    /// Volumes read (manga only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_volumes: Option<u32>,
    /// Rewatch / reread count.
    #[serde(default)]
    pub repeat: Option<u32>,
    /// Start date.
    #[serde(default)]
    pub started_at: Option<FuzzyDate>,
    /// Completion date.
    #[serde(default)]
    pub completed_at: Option<FuzzyDate>,
    /// Media details.
    #[serde(default)]
    pub media: Option<Media>,
}

/// A partially known date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyDate {
    /// Year, if known.
    #[serde(default)]
    pub year: Option<u32>,
    /// Month, if known.
    #[serde(default)]
    pub month: Option<u32>,
    /// Day, if known.
    #[serde(default)]
    pub day: Option<u32>,
}

/// Media details attached to an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    /// MyAnimeList id, when AniList knows it.
    #[serde(default)]
    pub id_mal: Option<i64>,
    /// AniList media id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Titles.
    #[serde(default)]
    pub title: Option<MediaTitle>,
    /// `ANIME` or `MANGA`.
    #[serde(rename = "type", default)]
    pub media_type: Option<String>,
    /// Format (`TV`, `MOVIE`, `MANGA`, `NOVEL`, ...).
    #[serde(default)]
    pub format: Option<String>,
    /// Total episodes (anime).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    /// Total chapters (manga).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<u32>,
    /// Total volumes (manga).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<u32>,
    /// Release status.
    #[serde(default)]
    pub status: Option<String>,
}

/// Title variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTitle {
    /// Romanised title.
    #[serde(default)]
    pub romaji: Option<String>,
    /// English title.
    #[serde(default)]
    pub english: Option<String>,
    /// Native title.
    #[serde(default)]
    pub native: Option<String>,
}

impl MediaTitle {
    /// First non-empty title, preferring romaji, then English, then native.
    pub fn preferred(&self) -> Option<&str> {
        [&self.romaji, &self.english, &self.native]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .find(|t| !t.is_empty())
    }
}

impl CollectionDocument {
    /// Flatten every list group of one kind into a single entry list.
    pub fn entries(&self, kind: MediaKind) -> Vec<MediaListEntry> {
        let collection = match kind {
            MediaKind::Anime => self.data.anime.as_ref(),
            MediaKind::Manga => self.data.manga.as_ref(),
        };
        collection
            .and_then(|c| c.lists.as_ref())
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(|g| g.entries.as_ref())
                    .flatten()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
