//! Error types for the anivault-anilist crate.
//!
//! A missing user is reported separately from every other failure so that
//! callers can tell "wrong username" apart from "AniList is unreachable".

/// Errors that can occur while fetching a user's lists from AniList.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested user does not exist on AniList.
    #[error("user '{0}' not found on AniList")]
    UserNotFound(String),

    /// The HTTP request could not be sent or the connection failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// AniList answered with a non-success status code.
    #[error("AniList returned status {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// First error message from the response body, if any.
        detail: String,
    },

    /// The GraphQL response carried errors alongside a success status.
    #[error("query error: {0}")]
    Query(String),

    /// The response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SourceError {
    /// Returns `true` when the error means the user does not exist.
    pub fn is_user_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_))
    }
}

/// Convenience type alias for anivault-anilist results.
pub type Result<T> = std::result::Result<T, SourceError>;
