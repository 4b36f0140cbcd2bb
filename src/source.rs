//! Where collections come from.

use anivault_anilist::{AniListClient, CollectionDocument, SourceError};
use async_trait::async_trait;

/// A remote service that can return an owner's collection.
///
/// The orchestrator only depends on this trait, so tests can substitute an
/// in-memory source.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Fetch the full collection of `owner_id`.
    ///
    /// Implementations report an unknown owner as
    /// [`SourceError::UserNotFound`].
    async fn fetch(&self, owner_id: &str) -> Result<CollectionDocument, SourceError>;
}

#[async_trait]
impl CollectionSource for AniListClient {
    async fn fetch(&self, owner_id: &str) -> Result<CollectionDocument, SourceError> {
        self.fetch_collection(owner_id).await
    }
}
