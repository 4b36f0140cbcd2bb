//! Error types for AniVault.

use anivault_anilist::SourceError;

/// Stable error codes for programmatic handling (HTTP mapping, client UIs).
///
/// These codes never change and form part of the public API contract.
pub mod error_codes {
    /// The remote source could not be queried.
    pub const FETCH_FAILED: &str = "FETCH_FAILED";
    /// The remote source does not know the owner.
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    /// An archive member is missing, empty or unparseable.
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    /// Persisted or supplied configuration is malformed.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    /// Disk I/O or archive packing failed.
    pub const STORAGE_FAILED: &str = "STORAGE_FAILED";
    /// The requested archive does not exist.
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// The request itself was malformed.
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
}

/// Top-level error type for the backup lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Remote source unavailable or owner unknown.
    #[error("fetch error: {0}")]
    Fetch(#[from] SourceError),

    /// Archive content incomplete or corrupt.
    #[error("validation error: {0}")]
    Validation(String),

    /// Persisted or supplied configuration is malformed.
    #[error("config error: {0}")]
    Config(String),

    /// Archive packing or persistence failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive (or other addressed resource) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller supplied an invalid argument.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl VaultError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Fetch(e) if e.is_user_not_found() => error_codes::USER_NOT_FOUND,
            Self::Fetch(_) => error_codes::FETCH_FAILED,
            Self::Validation(_) => error_codes::VALIDATION_FAILED,
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Storage(_) | Self::Io(_) => error_codes::STORAGE_FAILED,
            Self::NotFound(_) => error_codes::NOT_FOUND,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
        }
    }
}

impl From<zip::result::ZipError> for VaultError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Storage(format!("zip error: {e}"))
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, VaultError>;
