use serde::{Deserialize, Serialize};

use crate::traits::{FeedItem, Page, PlaylistSummary};

// ── List envelope ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> ListResponse<T> {
    pub fn into_page<U>(self, f: impl FnMut(T) -> Option<U>) -> Page<U> {
        Page {
            items: self.items.into_iter().filter_map(f).collect(),
            next_page_token: self.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

// ── playlists.list ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PlaylistResource {
    pub id: String,
    pub snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistSnippet {
    pub title: String,
}

impl PlaylistResource {
    pub fn into_summary(self) -> PlaylistSummary {
        PlaylistSummary {
            id: self.id,
            title: self.snippet.title,
        }
    }
}

// ── channels.list ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResource {
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

// ── playlistItems.list ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemResource {
    pub id: String,
    pub snippet: Option<PlaylistItemSnippet>,
    pub content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    pub title: String,
    pub published_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    pub video_id: String,
}

impl PlaylistItemResource {
    /// Feed entry for this item. `None` when the snippet or video id was not
    /// requested or is missing.
    pub fn into_feed_item(self) -> Option<FeedItem> {
        let snippet = self.snippet?;
        let details = self.content_details?;
        Some(FeedItem {
            video_id: details.video_id,
            title: snippet.title,
            published_at: snippet.published_at,
        })
    }
}

// ── playlistItems.insert ────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct InsertPlaylistItem<'a> {
    pub snippet: InsertSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertSnippet<'a> {
    pub playlist_id: &'a str,
    pub resource_id: ResourceId<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId<'a> {
    pub kind: &'static str,
    pub video_id: &'a str,
}

impl<'a> InsertPlaylistItem<'a> {
    pub fn video(video_id: &'a str, playlist_id: &'a str) -> Self {
        Self {
            snippet: InsertSnippet {
                playlist_id,
                resource_id: ResourceId {
                    kind: "youtube#video",
                    video_id,
                },
            },
        }
    }
}

// ── Error envelope ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub reason: Option<String>,
}
