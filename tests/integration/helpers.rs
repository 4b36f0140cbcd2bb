//! Shared helpers for integration tests.

use anivault::{CollectionSource, Vault, VaultConfig, VaultEvent, VaultPaths};
use anivault_anilist::{CollectionDocument, SourceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// In-memory source: known owners map to a fixed document, anyone else is
/// reported as not found.
pub(crate) struct FakeSource {
    docs: HashMap<String, CollectionDocument>,
}

impl FakeSource {
    pub(crate) fn with(owners: &[(&str, CollectionDocument)]) -> Self {
        Self {
            docs: owners
                .iter()
                .map(|(owner, doc)| ((*owner).to_owned(), doc.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl CollectionSource for FakeSource {
    async fn fetch(&self, owner_id: &str) -> Result<CollectionDocument, SourceError> {
        self.docs
            .get(owner_id)
            .cloned()
            .ok_or_else(|| SourceError::UserNotFound(owner_id.to_owned()))
    }
}

/// A small collection: two anime and one manga entry.
pub(crate) fn sample_doc() -> CollectionDocument {
    serde_json::from_value(serde_json::json!({
        "data": {
            "MediaListCollection": {"lists": [{"name": "Watching", "entries": [
                {"mediaId": 1, "status": "CURRENT", "score": 8, "progress": 12, "repeat": 0,
                 "media": {"idMal": 1, "title": {"romaji": "Cowboy Bebop"}, "format": "TV", "episodes": 26}},
                {"mediaId": 20, "status": "COMPLETED", "score": 6, "progress": 220, "repeat": 1,
                 "media": {"idMal": 20, "title": {"romaji": "Naruto"}, "format": "TV", "episodes": 220}}
            ]}]},
            "MediaListCollection2": {"lists": [{"name": "Reading", "entries": [
                {"mediaId": 30013, "status": "CURRENT", "score": 0, "progress": 40, "progressVolumes": 4,
                 "media": {"idMal": 104, "title": {"romaji": "Yotsuba&!"}}}
            ]}]}
        }
    }))
    .expect("sample document")
}

/// Both collections present but empty.
pub(crate) fn empty_doc() -> CollectionDocument {
    serde_json::from_value(serde_json::json!({
        "data": {
            "MediaListCollection": {"lists": []},
            "MediaListCollection2": {"lists": []}
        }
    }))
    .expect("empty document")
}

/// A vault rooted in its own temp dir. Keep the `TempDir` alive for the
/// duration of the test.
pub(crate) fn temp_vault(source: FakeSource) -> (Arc<Vault>, tempfile::TempDir) {
    temp_vault_with(source, VaultConfig::default())
}

pub(crate) fn temp_vault_with(
    source: FakeSource,
    config: VaultConfig,
) -> (Arc<Vault>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let vault = Vault::new(&config, VaultPaths::new(dir.path()), Arc::new(source))
        .expect("build vault");
    (Arc::new(vault), dir)
}

/// Drain all pending events from the broadcast receiver into a Vec.
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<VaultEvent>) -> Vec<VaultEvent> {
    let mut events = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        events.push(evt);
    }
    events
}

/// Wait (bounded) for the first event matching `pred`.
pub(crate) async fn wait_for<F>(rx: &mut broadcast::Receiver<VaultEvent>, pred: F) -> VaultEvent
where
    F: Fn(&VaultEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// File names directly under `dir`.
pub(crate) fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
