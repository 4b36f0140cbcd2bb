//! Collection statistics and the human-readable summary member.

use anivault_anilist::{CollectionDocument, MediaKind, MediaListEntry};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Minutes assumed per episode when estimating time watched.
const MINUTES_PER_EPISODE: u64 = 24;

/// Derived statistics for one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    /// Number of entries, including those with unrecognised statuses.
    pub total_entries: u64,
    /// Episodes watched (anime) or chapters read (manga).
    pub progress: u64,
    /// Volumes read. Only present for manga.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<u64>,
    /// Rewatches (anime) or rereads (manga).
    #[serde(default)]
    pub repeats: u64,
    /// Mean over strictly positive scores, one decimal; 0 when none.
    pub mean_score: f64,
    /// Normalised status counts.
    pub status: BTreeMap<String, u64>,
    /// Owner the collection belongs to.
    pub owner_id: String,
}

/// Statistics for both collections of one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveStats {
    /// Anime collection.
    pub anime: CollectionStats,
    /// Manga collection.
    pub manga: CollectionStats,
}

/// Histogram key for the collection's primary active status.
fn active_key(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Anime => "watching",
        MediaKind::Manga => "reading",
    }
}

/// Histogram keys in display order.
pub fn histogram_keys(kind: MediaKind) -> [&'static str; 5] {
    [active_key(kind), "completed", "planning", "dropped", "on_hold"]
}

/// Map a raw list status onto a histogram key.
///
/// Returns `None` for statuses outside the histogram; such entries still
/// count towards [`CollectionStats::total_entries`].
pub fn normalize_status(raw: &str, kind: MediaKind) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "current" | "repeating" | "watching" | "reading" => Some(active_key(kind)),
        "paused" | "on_hold" => Some("on_hold"),
        "completed" => Some("completed"),
        "planning" => Some("planning"),
        "dropped" => Some("dropped"),
        _ => None,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl CollectionStats {
    /// Compute statistics for `entries` of one `kind`.
    pub fn compute(entries: &[MediaListEntry], kind: MediaKind, owner_id: &str) -> Self {
        let mut status: BTreeMap<String, u64> = histogram_keys(kind)
            .iter()
            .map(|k| ((*k).to_owned(), 0))
            .collect();

        let mut progress = 0u64;
        let mut volumes = 0u64;
        let mut repeats = 0u64;
        let mut score_sum = 0.0f64;
        let mut scored = 0u64;

        for entry in entries {
            if let Some(key) = entry
                .status
                .as_deref()
                .and_then(|s| normalize_status(s, kind))
            {
                *status.entry(key.to_owned()).or_insert(0) += 1;
            }
            progress += u64::from(entry.progress.unwrap_or(0));
            volumes += u64::from(entry.progress_volumes.unwrap_or(0));
            repeats += u64::from(entry.repeat.unwrap_or(0));
            if let Some(score) = entry.score.filter(|s| *s > 0.0) {
                score_sum += score;
                scored += 1;
            }
        }

        let mean_score = if scored == 0 {
            0.0
        } else {
            round_one_decimal(score_sum / scored as f64)
        };

        Self {
            total_entries: entries.len() as u64,
            progress,
            volumes: (kind == MediaKind::Manga).then_some(volumes),
            repeats,
            mean_score,
            status,
            owner_id: owner_id.to_owned(),
        }
    }
}

impl ArchiveStats {
    /// Compute statistics for both collections of a fetched document.
    pub fn compute(doc: &CollectionDocument, owner_id: &str) -> Self {
        Self {
            anime: CollectionStats::compute(
                &doc.entries(MediaKind::Anime),
                MediaKind::Anime,
                owner_id,
            ),
            manga: CollectionStats::compute(
                &doc.entries(MediaKind::Manga),
                MediaKind::Manga,
                owner_id,
            ),
        }
    }

    /// Statistics for one kind.
    pub fn get(&self, kind: MediaKind) -> &CollectionStats {
        match kind {
            MediaKind::Anime => &self.anime,
            MediaKind::Manga => &self.manga,
        }
    }
}

/// Format `n` with `,` thousands separators.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Estimated viewing time as `Nd Nh`.
fn time_watched(episodes: u64) -> String {
    let hours = episodes * MINUTES_PER_EPISODE / 60;
    format!("{}d {}h", hours / 24, hours % 24)
}

fn push_distribution(out: &mut String, stats: &CollectionStats, kind: MediaKind) {
    out.push_str("Status Distribution:\n");
    for key in histogram_keys(kind) {
        let count = stats.status.get(key).copied().unwrap_or(0);
        let _ = writeln!(out, "- {key}: {count}");
    }
}

/// Render the `animemanga_stats.txt` member.
///
/// # Errors
///
/// Returns an error if the trailing JSON block cannot be serialised.
pub fn render_summary(
    stats: &ArchiveStats,
    owner_id: &str,
    generated_at: DateTime<Local>,
) -> serde_json::Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "Anime & Manga Statistics for {owner_id}");
    let _ = writeln!(
        out,
        "Generated on: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    let anime = &stats.anime;
    out.push_str("\n=== Anime Stats ===\n");
    let _ = writeln!(out, "Total Entries: {}", anime.total_entries);
    let _ = writeln!(out, "Episodes Watched: {}", group_thousands(anime.progress));
    let _ = writeln!(out, "Time Watched: {}", time_watched(anime.progress));
    let _ = writeln!(out, "Mean Score: {:.1}", anime.mean_score);
    let _ = writeln!(out, "Rewatched: {}\n", anime.repeats);
    push_distribution(&mut out, anime, MediaKind::Anime);

    let manga = &stats.manga;
    out.push_str("\n=== Manga Stats ===\n");
    let _ = writeln!(out, "Total Entries: {}", manga.total_entries);
    let _ = writeln!(out, "Chapters Read: {}", group_thousands(manga.progress));
    let _ = writeln!(
        out,
        "Volumes Read: {}",
        group_thousands(manga.volumes.unwrap_or(0))
    );
    let _ = writeln!(out, "Mean Score: {:.1}", manga.mean_score);
    let _ = writeln!(out, "Reread: {}\n", manga.repeats);
    push_distribution(&mut out, manga, MediaKind::Manga);

    out.push('\n');
    out.push_str(&serde_json::to_string_pretty(stats)?);
    out.push('\n');
    Ok(out)
}
