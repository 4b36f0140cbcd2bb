//! MyAnimeList-compatible XML export.
//!
//! [`format_export`] is pure: it never fails and never logs. Entries without
//! a usable id are returned in [`MalExport::skipped`] so the caller can
//! journal them.
//!
//! Two status mappings coexist: MAL's numeric status codes bucket the
//! `<myinfo>` totals, and textual labels fill each item's `<my_status>`.
//! Keep them separate even where they happen to agree.

use anivault_anilist::{FuzzyDate, MediaKind, MediaListEntry};
use std::fmt::Write as _;

/// Result of formatting one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MalExport {
    /// Complete XML document.
    pub document: String,
    /// Entries written.
    pub written: usize,
    /// Entries left out because they carry no usable id.
    pub skipped: Vec<SkippedEntry>,
}

/// An entry that could not be exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Best available title.
    pub title: String,
    /// AniList media id as received.
    pub media_id: Option<i64>,
    /// MAL id as received.
    pub id_mal: Option<i64>,
}

/// Numeric MAL status code used for the `<myinfo>` totals.
fn myinfo_bucket(status: &str) -> u8 {
    match status {
        "CURRENT" | "REPEATING" => 1,
        "COMPLETED" => 2,
        "PAUSED" => 3,
        "DROPPED" => 4,
        _ => 6,
    }
}

/// Textual MAL status written to `<my_status>`.
fn status_label(status: &str, kind: MediaKind) -> &'static str {
    match (status, kind) {
        ("CURRENT" | "REPEATING", MediaKind::Anime) => "Watching",
        ("CURRENT" | "REPEATING", MediaKind::Manga) => "Reading",
        ("COMPLETED", _) => "Completed",
        ("PAUSED", _) => "On-Hold",
        ("DROPPED", _) => "Dropped",
        (_, MediaKind::Anime) => "Plan to Watch",
        (_, MediaKind::Manga) => "Plan to Read",
    }
}

/// AniList format to MAL series type.
fn series_type(format: Option<&str>, kind: MediaKind) -> &'static str {
    let fallback = match kind {
        MediaKind::Anime => "TV",
        MediaKind::Manga => "Manga",
    };
    match format.map(str::to_ascii_uppercase).as_deref() {
        Some("TV" | "TV_SHORT") => "TV",
        Some("MOVIE") => "Movie",
        Some("SPECIAL") => "Special",
        Some("OVA") => "OVA",
        Some("ONA") => "ONA",
        Some("MUSIC") => "Music",
        Some("MANGA") => "Manga",
        Some("NOVEL") => "Novel",
        Some("ONE_SHOT") => "One-shot",
        Some("DOUJINSHI") => "Doujin",
        Some("MANHWA") => "Manhwa",
        Some("MANHUA") => "Manhua",
        Some("OEL") => "OEL",
        _ => fallback,
    }
}

/// MAL scores are 0..=10; AniList may use a 100-point scale.
fn normalize_score(raw: Option<f64>) -> u8 {
    match raw {
        Some(s) if s > 0.0 => {
            let scaled = if s > 10.0 { s / 10.0 } else { s };
            scaled.round().clamp(0.0, 10.0) as u8
        }
        _ => 0,
    }
}

/// `YYYY-MM-DD`, or `0000-00-00` when any part is unknown.
fn format_date(date: Option<&FuzzyDate>) -> String {
    match date {
        Some(FuzzyDate {
            year: Some(y),
            month: Some(m),
            day: Some(d),
        }) if *y != 0 && *m != 0 && *d != 0 => format!("{y:04}-{m:02}-{d:02}"),
        _ => "0000-00-00".to_owned(),
    }
}

fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

fn entry_title(entry: &MediaListEntry) -> String {
    entry
        .media
        .as_ref()
        .and_then(|m| m.title.as_ref())
        .and_then(|t| t.preferred())
        .unwrap_or("N/A Title")
        .to_owned()
}

/// MAL id, falling back to the AniList id. Zero counts as absent.
fn series_id(entry: &MediaListEntry) -> Option<i64> {
    entry
        .media
        .as_ref()
        .and_then(|m| m.id_mal)
        .filter(|id| *id != 0)
        .or(entry.media_id.filter(|id| *id != 0))
}

fn write_item(out: &mut String, entry: &MediaListEntry, id: i64, kind: MediaKind, status: &str) {
    let media = entry.media.clone().unwrap_or_default();
    let tag = kind.as_str();
    let progress = entry.progress.unwrap_or(0);
    let repeat = entry.repeat.unwrap_or(0);

    let _ = writeln!(out, "  <{tag}>");
    match kind {
        MediaKind::Anime => {
            let _ = writeln!(out, "    <series_animedb_id>{id}</series_animedb_id>");
        }
        MediaKind::Manga => {
            let _ = writeln!(out, "    <series_mangadb_id>{id}</series_mangadb_id>");
        }
    }
    let _ = writeln!(out, "    <series_title>{}</series_title>", cdata(&entry_title(entry)));
    let _ = writeln!(
        out,
        "    <series_type>{}</series_type>",
        series_type(media.format.as_deref(), kind)
    );
    match kind {
        MediaKind::Anime => {
            let _ = writeln!(
                out,
                "    <series_episodes>{}</series_episodes>",
                media.episodes.unwrap_or(0)
            );
            let _ = writeln!(out, "    <my_watched_episodes>{progress}</my_watched_episodes>");
            let _ = writeln!(out, "    <my_times_watched>{repeat}</my_times_watched>");
            out.push_str("    <my_rewatching_ep>0</my_rewatching_ep>\n");
        }
        MediaKind::Manga => {
            let _ = writeln!(
                out,
                "    <series_chapters>{}</series_chapters>",
                media.chapters.unwrap_or(0)
            );
            let _ = writeln!(
                out,
                "    <series_volumes>{}</series_volumes>",
                media.volumes.unwrap_or(0)
            );
            let _ = writeln!(out, "    <my_read_chapters>{progress}</my_read_chapters>");
            let _ = writeln!(
                out,
                "    <my_read_volumes>{}</my_read_volumes>",
                entry.progress_volumes.unwrap_or(0)
            );
            let _ = writeln!(out, "    <my_times_read>{repeat}</my_times_read>");
            out.push_str("    <my_rereading_chap>0</my_rereading_chap>\n");
        }
    }
    out.push_str("    <my_id>0</my_id>\n");
    let _ = writeln!(
        out,
        "    <my_start_date>{}</my_start_date>",
        format_date(entry.started_at.as_ref())
    );
    let _ = writeln!(
        out,
        "    <my_finish_date>{}</my_finish_date>",
        format_date(entry.completed_at.as_ref())
    );
    out.push_str("    <my_rated></my_rated>\n");
    let _ = writeln!(out, "    <my_score>{}</my_score>", normalize_score(entry.score));
    out.push_str("    <my_storage></my_storage>\n");
    out.push_str("    <my_storage_value>0.00</my_storage_value>\n");
    let _ = writeln!(out, "    <my_status>{}</my_status>", status_label(status, kind));
    out.push_str("    <my_comments><![CDATA[]]></my_comments>\n");
    out.push_str("    <my_rewatch_value></my_rewatch_value>\n");
    out.push_str("    <my_priority>LOW</my_priority>\n");
    out.push_str("    <my_tags><![CDATA[]]></my_tags>\n");
    out.push_str("    <my_discuss>1</my_discuss>\n");
    out.push_str("    <my_sns>default</my_sns>\n");
    out.push_str("    <update_on_import>1</update_on_import>\n");
    let _ = writeln!(out, "  </{tag}>");
}

/// Format one collection as a MAL import document.
pub fn format_export(entries: &[MediaListEntry], kind: MediaKind, owner_id: &str) -> MalExport {
    let mut items = String::new();
    let mut buckets = [0usize; 7];
    let mut skipped = Vec::new();
    let mut written = 0usize;

    for entry in entries {
        let Some(id) = series_id(entry) else {
            skipped.push(SkippedEntry {
                title: entry_title(entry),
                media_id: entry.media_id,
                id_mal: entry.media.as_ref().and_then(|m| m.id_mal),
            });
            continue;
        };
        written += 1;

        let status = entry
            .status
            .as_deref()
            .unwrap_or("PLANNING")
            .to_ascii_uppercase();
        buckets[usize::from(myinfo_bucket(&status))] += 1;
        write_item(&mut items, entry, id, kind, &status);
    }

    let mut doc = String::new();
    doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n");
    let _ = writeln!(
        doc,
        "<!--\n Created by AniVault (AniList Backup Manager)\n Version {}\n-->",
        env!("CARGO_PKG_VERSION")
    );
    doc.push_str("<myanimelist>\n");
    doc.push_str("  <myinfo>\n");
    doc.push_str("    <user_id></user_id>\n");
    let _ = writeln!(doc, "    <user_name>{}</user_name>", cdata(owner_id));
    let (export_type, active, plan) = match kind {
        MediaKind::Anime => (1, "watching", "plantowatch"),
        MediaKind::Manga => (2, "reading", "plantoread"),
    };
    let _ = writeln!(doc, "    <user_export_type>{export_type}</user_export_type>");
    let _ = writeln!(doc, "    <user_total_{kind}>{written}</user_total_{kind}>");
    let _ = writeln!(doc, "    <user_total_{active}>{}</user_total_{active}>", buckets[1]);
    let _ = writeln!(doc, "    <user_total_completed>{}</user_total_completed>", buckets[2]);
    let _ = writeln!(doc, "    <user_total_onhold>{}</user_total_onhold>", buckets[3]);
    let _ = writeln!(doc, "    <user_total_dropped>{}</user_total_dropped>", buckets[4]);
    let _ = writeln!(doc, "    <user_total_{plan}>{}</user_total_{plan}>", buckets[6]);
    doc.push_str("  </myinfo>\n");
    doc.push_str(&items);
    doc.push_str("</myanimelist>\n");

    MalExport {
        document: doc,
        written,
        skipped,
    }
}
