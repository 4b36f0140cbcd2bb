//! HTTP routes against a live server on an ephemeral port.

use crate::helpers::{FakeSource, sample_doc, temp_vault};
use anivault::VaultServer;
use anivault::config::ServerConfig;
use futures_util::StreamExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    base: String,
    client: reqwest::Client,
    server: VaultServer,
    vault: Arc<anivault::Vault>,
    _dir: tempfile::TempDir,
}

async fn start() -> Harness {
    let (vault, dir) = temp_vault(FakeSource::with(&[("alice", sample_doc())]));
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
    };
    let server = VaultServer::start(Arc::clone(&vault), &config).await.unwrap();
    Harness {
        base: format!("http://{}", server.addr()),
        client: reqwest::Client::new(),
        server,
        vault,
        _dir: dir,
    }
}

impl Harness {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn backup_routes_round_trip() {
    let h = start().await;

    let (status, body) = h.get_json("/latest-stats").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({}));

    let (status, body) = h.post_json("/backup", json!({"username": "alice"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    let id = body["data"]["id"].as_str().unwrap().to_owned();

    let (status, body) = h.get_json("/backups?username=alice").await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], id.as_str());
    assert_eq!(body[0]["content"], "2 Anime, 1 Manga");

    let (status, body) = h.get_json(&format!("/backup/{id}/stats")).await;
    assert_eq!(status, 200);
    assert_eq!(body["anime"]["totalEntries"], 2);

    let (_, latest) = h.get_json("/latest-stats").await;
    assert_eq!(latest["archive_id"], id.as_str());

    let resp = h
        .client
        .get(h.url(&format!("/backup/{id}/download")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "application/zip");
    let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_owned();
    assert!(disposition.contains(&format!("{id}.zip")));
    let bytes = resp.bytes().await.unwrap();
    assert!(bytes.starts_with(b"PK"));

    let resp = h
        .client
        .delete(h.url(&format!("/backup/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let (_, body) = h.get_json("/backups").await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, latest) = h.get_json("/latest-stats").await;
    assert_eq!(latest, json!({}));

    h.server.stop();
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let h = start().await;

    let (status, body) = h.post_json("/backup", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, body) = h.post_json("/backup", json!({"username": "ghost"})).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "USER_NOT_FOUND");

    let (status, body) = h.get_json("/backup/alice_20200101_000000_000/stats").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = h.get_json("/backup/a..b/stats").await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let resp = h
        .client
        .post(h.url("/backup"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    h.server.stop();
}

#[tokio::test]
async fn schedule_routes_accept_string_numbers() {
    let h = start().await;

    let (status, body) = h.post_json("/stop-auto-backup", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Auto backup was not running.");

    let (status, body) = h
        .post_json(
            "/auto-backup",
            json!({"username": "alice", "keepLast": "2", "interval": "6"}),
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["config"]["keepLast"], 2);

    let (status, body) = h.get_json("/auto-backup-status").await;
    assert_eq!(status, 200);
    assert_eq!(body["running"], true);
    assert_eq!(body["schedule"]["username"], "alice");

    let (status, body) = h.post_json("/stop-auto-backup", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Auto backup stopped.");

    let (_, body) = h.get_json("/auto-backup-status").await;
    assert_eq!(body["running"], false);
    assert!(body["schedule"].is_null());

    let (status, body) = h
        .post_json(
            "/auto-backup",
            json!({"username": "alice", "keepLast": 0, "interval": 1}),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, _) = h
        .post_json("/auto-backup", json!({"username": "alice", "keepLast": 1}))
        .await;
    assert_eq!(status, 400);

    h.server.stop();
}

#[tokio::test]
async fn client_logs_are_prefixed() {
    let h = start().await;

    let (status, _) = h
        .post_json("/save-log", json!({"message": "opened page", "isSuccess": true}))
        .await;
    assert_eq!(status, 200);

    let (status, body) = h.get_json("/logs").await;
    assert_eq!(status, 200);
    let last = body.as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["message"], "[CLIENT] opened page");
    assert_eq!(last["is_success"], true);

    h.server.stop();
}

#[tokio::test]
async fn rejected_client_logs_are_journaled() {
    let h = start().await;

    let (status, body) = h.post_json("/save-log", json!({"isSuccess": true})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let resp = h
        .client
        .post(h.url("/save-log"))
        .header("content-type", "application/json")
        .body("{bad")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let failures: Vec<String> = h
        .vault
        .logs()
        .into_iter()
        .filter(|e| !e.success)
        .map(|e| e.message)
        .collect();
    assert_eq!(failures.len(), 2, "{failures:?}");
    assert!(failures[0].starts_with("Save log: ") && failures[0].contains("Message is required"));
    assert!(failures[1].starts_with("Save log: ") && failures[1].contains("malformed request body"));

    h.server.stop();
}

#[tokio::test]
async fn event_stream_delivers_log_updates() {
    let h = start().await;

    let resp = h.client.get(h.url("/events")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    assert_eq!(h.vault.notifier().observer_count(), 1);

    h.vault.client_log("ping", true);

    let mut stream = resp.bytes_stream();
    let received = tokio::time::timeout(Duration::from_secs(5), async {
        let mut buf = String::new();
        while let Some(chunk) = stream.next().await {
            buf.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
            if buf.contains("\n\n") {
                break;
            }
        }
        buf
    })
    .await
    .unwrap();

    let data = received
        .lines()
        .find_map(|l| l.strip_prefix("data: "))
        .expect("data line");
    let event: Value = serde_json::from_str(data).unwrap();
    assert_eq!(event["type"], "log_updated");
    assert_eq!(event["data"]["message"], "[CLIENT] ping");

    h.server.stop();
}
