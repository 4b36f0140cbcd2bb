//! Scheduled runs with keep-N retention, and the schedule lifecycle.

use crate::helpers::{FakeSource, drain_events, sample_doc, temp_vault, wait_for};
use anivault::VaultEvent;
use anivault::error::error_codes;

#[tokio::test]
async fn scheduled_runs_prune_to_keep_last() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[("alice", sample_doc())]));
    let mut rx = vault.notifier().receiver();

    // A long interval: only the immediate first run happens in the background.
    let schedule = vault.start_schedule("alice", 2, 24.0).await.unwrap();
    let first = wait_for(&mut rx, |e| matches!(e, VaultEvent::BackupCreated(_))).await;

    // Stopping waits for the background run to finish its pruning pass.
    assert!(vault.stop_schedule().await.unwrap());

    let second = vault.scheduler().run_once(&schedule).await.unwrap();
    assert!(second.pruned.is_empty());
    let third = vault.scheduler().run_once(&schedule).await.unwrap();
    assert_eq!(third.pruned.len(), 1);

    let remaining = vault.list_backups(Some("alice")).unwrap();
    let ids: Vec<&str> = remaining.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![third.archive.id.as_str(), second.archive.id.as_str()]);

    let VaultEvent::BackupCreated(first_meta) = first else {
        unreachable!()
    };
    assert_eq!(third.pruned, vec![first_meta.id.clone()]);

    let events = drain_events(&mut rx);
    let created = events
        .iter()
        .filter(|e| matches!(e, VaultEvent::BackupCreated(_)))
        .count();
    let deleted = events
        .iter()
        .filter(|e| matches!(e, VaultEvent::BackupDeleted { .. }))
        .count();
    // The first creation was consumed by `wait_for`.
    assert_eq!(created, 2);
    assert!(deleted >= 1);

    assert_eq!(vault.latest_stats().unwrap().archive_id, third.archive.id);
}

#[tokio::test]
async fn retention_only_touches_the_scheduled_owner() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[
        ("alice", sample_doc()),
        ("bob", sample_doc()),
    ]));
    let bob = vault.create_backup("bob").await.unwrap();

    let schedule = anivault::Schedule::new("alice", 1, 24.0).unwrap();
    vault.scheduler().run_once(&schedule).await.unwrap();
    let report = vault.scheduler().run_once(&schedule).await.unwrap();
    assert_eq!(report.pruned.len(), 1);

    assert_eq!(vault.list_backups(Some("alice")).unwrap().len(), 1);
    let bobs = vault.list_backups(Some("bob")).unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].id, bob.id);
}

#[tokio::test]
async fn stop_when_idle_is_a_noop() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[]));
    let mut rx = vault.notifier().receiver();

    assert!(!vault.stop_schedule().await.unwrap());
    assert!(drain_events(&mut rx).is_empty());
    assert!(vault.logs().is_empty());

    let status = vault.schedule_status().await;
    assert!(!status.running);
    assert!(status.schedule.is_none());
}

#[tokio::test]
async fn status_reports_running_schedule_and_persists_it() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[("alice", sample_doc())]));

    vault.start_schedule("alice", 3, 12.0).await.unwrap();
    let status = vault.schedule_status().await;
    assert!(status.running);
    let schedule = status.schedule.unwrap();
    assert_eq!(schedule.owner_id, "alice");
    assert_eq!(schedule.keep_last, 3);

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(vault.paths().schedule_file()).unwrap()).unwrap();
    assert_eq!(raw["username"], "alice");
    assert_eq!(raw["keepLast"], 3);

    // Shutdown keeps the persisted schedule for the next start.
    vault.shutdown().await;
    assert!(vault.paths().schedule_file().exists());

    assert!(vault.resume_schedule().await);
    assert!(vault.schedule_status().await.running);

    assert!(vault.stop_schedule().await.unwrap());
    assert!(!vault.paths().schedule_file().exists());
    assert!(!vault.schedule_status().await.running);
}

#[tokio::test]
async fn invalid_schedule_is_rejected_and_journaled() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[]));

    for (owner, keep, interval) in [("", 1, 1.0), ("alice", 0, 1.0), ("alice", 1, -2.0)] {
        let err = vault.start_schedule(owner, keep, interval).await.unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_REQUEST);
    }
    assert!(!vault.schedule_status().await.running);
    assert_eq!(vault.logs().iter().filter(|e| !e.success).count(), 3);
}
