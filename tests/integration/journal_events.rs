//! Journal bounds and event fan-out as seen from a [`Vault`].

use crate::helpers::{FakeSource, drain_events, sample_doc, temp_vault, temp_vault_with};
use anivault::{VaultConfig, VaultEvent};
use futures_util::StreamExt;
use std::time::Duration;

#[tokio::test]
async fn journal_keeps_newest_hundred() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[]));

    for i in 0..105 {
        vault.client_log(&format!("entry {i}"), i % 2 == 0);
    }

    let logs = vault.logs();
    assert_eq!(logs.len(), 100);
    assert_eq!(logs[0].message, "[CLIENT] entry 5");
    assert_eq!(logs[99].message, "[CLIENT] entry 104");
    assert!(logs[99].success);

    // Persisted across a reload of the same data directory.
    let raw = std::fs::read(vault.paths().journal_file()).unwrap();
    let persisted: Vec<serde_json::Value> = serde_json::from_slice(&raw).unwrap();
    assert_eq!(persisted.len(), 100);
    assert_eq!(persisted[99]["is_success"], true);
}

#[tokio::test]
async fn every_append_is_published() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[]));
    let mut rx = vault.notifier().receiver();

    let entry = vault.client_log("hello", true);

    let events = drain_events(&mut rx);
    assert_eq!(events, vec![VaultEvent::LogUpdated(entry)]);
}

#[tokio::test]
async fn concurrent_observers_each_see_backup() {
    let (vault, _dir) = temp_vault(FakeSource::with(&[("alice", sample_doc())]));
    let first = vault.subscribe();
    let second = vault.subscribe();
    assert_eq!(vault.notifier().observer_count(), 2);

    let meta = vault.create_backup("alice").await.unwrap();

    for stream in [first, second] {
        let created = tokio::time::timeout(
            Duration::from_secs(5),
            stream
                .filter(|e| futures_util::future::ready(matches!(e, VaultEvent::BackupCreated(_))))
                .boxed()
                .next(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(created, VaultEvent::BackupCreated(meta.clone()));
    }
    assert_eq!(vault.notifier().observer_count(), 0);
}

#[tokio::test]
async fn quiet_observer_gets_keep_alive() {
    let mut config = VaultConfig::default();
    config.events.keep_alive_secs = 1;
    let (vault, _dir) = temp_vault_with(FakeSource::with(&[]), config);

    let mut stream = Box::pin(vault.subscribe());
    let event = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, VaultEvent::KeepAlive);
    assert_eq!(event.to_json(), serde_json::json!({"type": "keep-alive", "data": {}}));
}
