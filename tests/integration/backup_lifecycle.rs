//! Manual backup, listing, stats, download and deletion through [`Vault`].

use crate::helpers::{FakeSource, dir_entries, drain_events, empty_doc, sample_doc, temp_vault};
use anivault::VaultEvent;
use anivault::archive::{self, MEMBERS};
use anivault::error::error_codes;
use std::io::{Cursor, Read};

#[tokio::test]
async fn manual_backup_produces_complete_archive() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[("alice", sample_doc())]));

    let meta = vault.create_backup("  alice ").await.unwrap();
    assert_eq!(meta.owner_id, "alice");
    assert!(meta.id.starts_with("alice_"));
    assert_eq!(meta.stats.anime.total_entries, 2);
    assert_eq!(meta.stats.anime.progress, 232);
    assert_eq!(meta.stats.anime.repeats, 1);
    assert_eq!(meta.stats.anime.mean_score, 7.0);
    assert_eq!(meta.stats.manga.total_entries, 1);
    assert_eq!(meta.stats.manga.volumes, Some(4));
    assert_eq!(meta.stats.anime.volumes, None);

    // Only the finalized archive is left in the backups directory.
    let backups = vault.paths().backups_dir();
    assert_eq!(dir_entries(&backups), vec![format!("{}.zip", meta.id)]);

    let bytes = vault.download_backup(&meta.id).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    for member in MEMBERS {
        let mut content = String::new();
        zip.by_name(member)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(!content.trim().is_empty(), "{member} is empty");
    }

    let mut xml = String::new();
    zip.by_name(archive::ANIME_XML)
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    assert!(xml.contains("<series_title><![CDATA[Cowboy Bebop]]></series_title>"));
    assert!(xml.contains("<user_name><![CDATA[alice]]></user_name>"));

    archive::validate_packed(&backups.join(format!("{}.zip", meta.id))).unwrap();
}

#[tokio::test]
async fn listing_and_stats_follow_created_archives() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[
        ("alice", sample_doc()),
        ("bob", empty_doc()),
    ]));

    let first = vault.create_backup("alice").await.unwrap();
    let bob = vault.create_backup("bob").await.unwrap();
    let second = vault.create_backup("alice").await.unwrap();

    let all = vault.list_backups(None).unwrap();
    let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), bob.id.as_str(), first.id.as_str()]);

    let alice = vault.list_backups(Some("alice")).unwrap();
    assert_eq!(alice.len(), 2);
    assert_eq!(alice[0].content, "2 Anime, 1 Manga");

    let bob_list = vault.list_backups(Some("bob")).unwrap();
    assert_eq!(bob_list.len(), 1);
    assert_eq!(bob_list[0].content, "0 Anime, 0 Manga");

    let stats = vault.backup_stats(&first.id).unwrap();
    assert_eq!(stats, first.stats);

    // The latest stats always track the most recent archive.
    let latest = vault.latest_stats().unwrap();
    assert_eq!(latest.archive_id, second.id);
}

#[tokio::test]
async fn unknown_owner_fails_and_leaves_nothing() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[]));

    let err = vault.create_backup("ghost").await.unwrap_err();
    assert_eq!(err.code(), error_codes::USER_NOT_FOUND);
    assert!(dir_entries(&vault.paths().backups_dir()).is_empty());
    assert!(vault.latest_stats().is_none());

    let logs = vault.logs();
    assert!(
        logs.iter()
            .any(|e| !e.success && e.message.contains("ghost")),
        "failure should be journaled"
    );
}

#[tokio::test]
async fn empty_owner_is_rejected() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[("alice", sample_doc())]));
    let err = vault.create_backup("   ").await.unwrap_err();
    assert_eq!(err.code(), error_codes::INVALID_REQUEST);
}

#[tokio::test]
async fn empty_collections_still_archive() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[("carol", empty_doc())]));
    let meta = vault.create_backup("carol").await.unwrap();
    assert_eq!(meta.stats.anime.total_entries, 0);
    assert_eq!(meta.stats.anime.mean_score, 0.0);
    assert_eq!(meta.stats.anime.status.values().sum::<u64>(), 0);
}

#[tokio::test]
async fn deleting_only_archive_clears_latest() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[("alice", sample_doc())]));
    let meta = vault.create_backup("alice").await.unwrap();
    assert!(vault.latest_stats().is_some());

    let mut rx = vault.notifier().receiver();
    vault.delete_backup(&meta.id).await.unwrap();

    assert!(vault.latest_stats().is_none());
    assert!(vault.list_backups(None).unwrap().is_empty());

    let events = drain_events(&mut rx);
    assert!(events.contains(&VaultEvent::BackupDeleted { id: meta.id.clone() }));
    let cleared = events
        .iter()
        .find(|e| matches!(e, VaultEvent::LatestStatsUpdated(_)))
        .expect("latest stats event");
    assert_eq!(cleared, &VaultEvent::LatestStatsUpdated(None));
    assert_eq!(cleared.payload(), serde_json::json!({}));
}

#[tokio::test]
async fn deleting_newest_falls_back_to_previous() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[("alice", sample_doc())]));
    let older = vault.create_backup("alice").await.unwrap();
    let newer = vault.create_backup("alice").await.unwrap();

    vault.delete_backup(&newer.id).await.unwrap();
    assert_eq!(vault.latest_stats().unwrap().archive_id, older.id);
}

#[tokio::test]
async fn addressing_bad_ids() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[]));

    let err = vault.delete_backup("alice_20240101_000000_000").await.unwrap_err();
    assert_eq!(err.code(), error_codes::NOT_FOUND);

    for bad in ["", "../etc", "a/b", "a\\b"] {
        let err = vault.backup_stats(bad).unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_REQUEST, "id {bad:?}");
    }
}

#[tokio::test]
async fn owners_that_would_escape_backups_are_refused() {
    let (vault, dir) = temp_vault(FakeSource::with(&[
        ("../escape", sample_doc()),
        ("a..b", sample_doc()),
    ]));

    for owner in ["../escape", "a..b"] {
        let err = vault.create_backup(owner).await.unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_REQUEST, "owner {owner:?}");
        let err = vault.start_schedule(owner, 1, 1.0).await.unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_REQUEST, "owner {owner:?}");
    }

    assert!(dir_entries(&vault.paths().backups_dir()).is_empty());
    assert!(!dir.path().read_dir().unwrap().any(|e| e
        .unwrap()
        .file_name()
        .to_string_lossy()
        .starts_with("escape")));
    assert!(vault.latest_stats().is_none());
    assert!(vault.logs().iter().any(|e| !e.success && e.message.contains("a..b")));
}

#[tokio::test]
async fn corrupt_archive_is_skipped_in_listing() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[("alice", sample_doc())]));
    let good = vault.create_backup("alice").await.unwrap();
    std::fs::write(
        vault.paths().backups_dir().join("alice_19990101_000000_000.zip"),
        b"not a zip",
    )
    .unwrap();

    let listed = vault.list_backups(None).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, good.id);
    assert!(vault.logs().iter().any(|e| !e.success));
}
