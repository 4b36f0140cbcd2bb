//! GraphQL client for the user collection query.

use crate::config::SourceConfig;
use crate::error::{Result, SourceError};
use crate::http;
use crate::types::{CollectionData, CollectionDocument};
use serde::Deserialize;

/// Fetches both lists in one round trip. The manga collection is aliased to
/// `MediaListCollection2` because GraphQL forbids two unaliased selections of
/// the same field with different arguments.
pub const COLLECTION_QUERY: &str = r#"
query ($username: String) {
    MediaListCollection(userName: $username, type: ANIME) {
        lists {
            name
            entries {
                mediaId
                status
                score
                progress
                repeat
                startedAt { year month day }
                completedAt { year month day }
                media {
                    idMal
                    id
                    title { romaji english native }
                    type
                    format
                    episodes
                    status
                }
            }
        }
    }
    MediaListCollection2: MediaListCollection(userName: $username, type: MANGA) {
        lists {
            name
            entries {
                mediaId
                status
                score
                progress
                progressVolumes
                repeat
                startedAt { year month day }
                completedAt { year month day }
                media {
                    idMal
                    id
                    title { romaji english native }
                    type
                    format
                    chapters
                    volumes
                    status
                }
            }
        }
    }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<CollectionData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<u16>,
}

/// AniList API client.
pub struct AniListClient {
    config: SourceConfig,
    client: reqwest::Client,
}

impl AniListClient {
    /// Create a client after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] for an invalid config, or
    /// [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: SourceConfig) -> Result<Self> {
        config.validate()?;
        let client = http::build_client(&config)?;
        Ok(Self { config, client })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Fetch the anime and manga lists of `username`.
    ///
    /// # Errors
    ///
    /// - [`SourceError::UserNotFound`] when AniList does not know the user.
    /// - [`SourceError::Http`] on connection failures.
    /// - [`SourceError::Status`] on any other non-success status.
    /// - [`SourceError::Query`] when a 200 response carries GraphQL errors.
    /// - [`SourceError::Parse`] when the body is not the expected shape.
    pub async fn fetch_collection(&self, username: &str) -> Result<CollectionDocument> {
        tracing::debug!(username, "fetching AniList collection");

        let body = serde_json::json!({
            "query": COLLECTION_QUERY,
            "variables": { "username": username },
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "AniList request failed");
                SourceError::Http(format!("connection error: {e}"))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SourceError::Http(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            tracing::warn!(status = %status, "AniList request returned error");
            return Err(http::map_http_error(status, &text, username));
        }

        parse_response(&text, username)
    }
}

/// Decode a successful GraphQL response body.
fn parse_response(text: &str, username: &str) -> Result<CollectionDocument> {
    let parsed: GraphQlResponse =
        serde_json::from_str(text).map_err(|e| SourceError::Parse(e.to_string()))?;

    if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
        let not_found = errors.iter().any(|e| {
            e.status == Some(404) || e.message.to_ascii_lowercase().contains("not found")
        });
        if not_found {
            return Err(SourceError::UserNotFound(username.to_owned()));
        }
        let joined = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SourceError::Query(joined));
    }

    let data = parsed
        .data
        .ok_or_else(|| SourceError::Parse("response has no data object".into()))?;
    Ok(CollectionDocument { data })
}
