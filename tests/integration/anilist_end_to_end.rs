//! A vault built from config, fetching from a mock AniList endpoint.

use anivault::error::error_codes;
use anivault::{Vault, VaultConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, data_dir: &std::path::Path) -> VaultConfig {
    let mut config = VaultConfig::default();
    config.source.api_url = server.uri();
    config.source.timeout_secs = 5;
    config.storage.data_dir = Some(data_dir.to_path_buf());
    config
}

#[tokio::test]
async fn backup_from_mock_anilist() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"variables": {"username": "alice"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "MediaListCollection": {"lists": [{"name": "Completed", "entries": [
                    {"mediaId": 1, "status": "COMPLETED", "score": 9, "progress": 26,
                     "media": {"idMal": 1, "title": {"romaji": "Cowboy Bebop"}, "format": "TV", "episodes": 26}}
                ]}]},
                "MediaListCollection2": {"lists": []}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::from_config(&config_for(&server, dir.path())).unwrap();

    let meta = vault.create_backup("alice").await.unwrap();
    assert_eq!(meta.stats.anime.total_entries, 1);
    assert_eq!(meta.stats.anime.mean_score, 9.0);
    assert_eq!(meta.stats.manga.total_entries, 0);
    assert!(dir.path().join("backups").join(format!("{}.zip", meta.id)).is_file());
}

#[tokio::test]
async fn unknown_user_from_mock_anilist() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "data": null,
            "errors": [{"message": "User not found", "status": 404}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::from_config(&config_for(&server, dir.path())).unwrap();

    let err = vault.create_backup("ghost").await.unwrap_err();
    assert_eq!(err.code(), error_codes::USER_NOT_FOUND);
    assert!(vault.list_backups(None).unwrap().is_empty());
}

#[tokio::test]
async fn service_outage_is_a_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::from_config(&config_for(&server, dir.path())).unwrap();

    let err = vault.create_backup("alice").await.unwrap_err();
    assert_eq!(err.code(), error_codes::FETCH_FAILED);
    assert!(vault.latest_stats().is_none());
}
