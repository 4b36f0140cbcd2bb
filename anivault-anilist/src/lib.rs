//! # anivault-anilist
//!
//! Minimal AniList GraphQL client for AniVault.
//!
//! Exposes one operation, [`AniListClient::fetch_collection`], which returns
//! a user's anime and manga lists as a typed [`CollectionDocument`]. An
//! unknown user is reported as [`SourceError::UserNotFound`] so callers can
//! distinguish it from transport or service failures.
//!
//! ```no_run
//! # async fn example() -> anivault_anilist::Result<()> {
//! use anivault_anilist::{AniListClient, MediaKind, SourceConfig};
//!
//! let client = AniListClient::new(SourceConfig::default())?;
//! let doc = client.fetch_collection("alice").await?;
//! println!("{} anime entries", doc.entries(MediaKind::Anime).len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::AniListClient;
pub use config::SourceConfig;
pub use error::{Result, SourceError};
pub use types::{
    CollectionData, CollectionDocument, FuzzyDate, Media, MediaKind, MediaListCollection,
    MediaListEntry, MediaListGroup, MediaTitle,
};
