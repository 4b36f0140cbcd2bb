//! Client configuration with sensible defaults.

use crate::error::SourceError;

/// Public AniList GraphQL endpoint.
pub const DEFAULT_API_URL: &str = "https://graphql.anilist.co";

/// Configuration for an [`AniListClient`](crate::AniListClient).
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// GraphQL endpoint URL.
    pub api_url: String,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Custom User-Agent string. Defaults to `anivault/<version>`.
    pub user_agent: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            timeout_seconds: 30,
            user_agent: None,
        }
    }
}

impl SourceConfig {
    /// Point the client at a different endpoint (used by tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `api_url` must start with `http://` or `https://`
    /// - `timeout_seconds` must be greater than 0
    pub fn validate(&self) -> Result<(), SourceError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(SourceError::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(SourceError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
