//! Trait definitions for the remote collaborators of a sync run.
//!
//! The YouTube client implements [`CatalogService`] and the token file
//! implements [`CredentialProvider`]; the orchestrator only sees the traits,
//! so tests can drive it with in-memory fakes.

use std::future::Future;

use crate::error::ApiError;

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }
}

/// A playlist owned by the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub title: String,
}

/// An entry from a channel's upload feed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeedItem {
    pub video_id: String,
    pub title: String,
    /// ISO-8601 UTC, exactly as returned by the service.
    pub published_at: String,
}

/// Yields a bearer token for the catalog service.
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> impl Future<Output = Result<String, ApiError>> + Send;
}

/// The video-hosting catalog: playlists, upload feeds and playlist membership.
pub trait CatalogService: Send + Sync {
    /// List one page of the authenticated user's playlists.
    fn list_owned_playlists(
        &self,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<Page<PlaylistSummary>, ApiError>> + Send;

    /// Resolve a channel id to the id of its upload feed.
    ///
    /// Fails with [`ApiError::NotFound`] when the channel does not exist.
    fn resolve_upload_feed(
        &self,
        channel_id: &str,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;

    /// List one page of an upload feed, most recent first.
    fn list_upload_feed(
        &self,
        feed_id: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> impl Future<Output = Result<Page<FeedItem>, ApiError>> + Send;

    /// Whether `video_id` is already in `playlist_id`.
    fn is_member(
        &self,
        video_id: &str,
        playlist_id: &str,
    ) -> impl Future<Output = Result<bool, ApiError>> + Send;

    /// Append `video_id` to `playlist_id`.
    fn insert_member(
        &self,
        video_id: &str,
        playlist_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}
