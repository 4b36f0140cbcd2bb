//! Shared HTTP client construction.

use crate::config::SourceConfig;
use crate::error::SourceError;
use std::time::Duration;

/// Build a [`reqwest::Client`] for AniList requests.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SourceConfig) -> Result<reqwest::Client, SourceError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(default_user_agent);

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .build()
        .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {e}")))
}

/// `anivault/<crate version>`.
pub fn default_user_agent() -> String {
    format!("anivault/{}", env!("CARGO_PKG_VERSION"))
}

/// Map a non-success HTTP response to a typed error.
///
/// AniList answers unknown usernames with `404` and a GraphQL error body.
pub fn map_http_error(status: reqwest::StatusCode, body: &str, username: &str) -> SourceError {
    if status == reqwest::StatusCode::NOT_FOUND {
        return SourceError::UserNotFound(username.to_owned());
    }
    SourceError::Status {
        status: status.as_u16(),
        detail: extract_error_message(body),
    }
}

/// Extract the first GraphQL error message from a response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/errors/0/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no response body".to_owned()
            } else {
                body.chars().take(500).collect()
            }
        })
}
