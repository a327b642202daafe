use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use super::types::{
    ChannelResource, ErrorEnvelope, InsertPlaylistItem, ListResponse, PlaylistItemResource,
    PlaylistResource,
};
use crate::error::ApiError;
use crate::traits::{CatalogService, FeedItem, Page, PlaylistSummary};

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Maximum page size the Data API accepts.
const MAX_RESULTS: u32 = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// YouTube Data API v3 client.
pub struct YoutubeClient {
    access_token: String,
    base_url: String,
    http: Client,
}

impl YoutubeClient {
    pub fn new(access_token: String) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            access_token,
            base_url: BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Check the HTTP response for errors, decoding Google's error envelope.
    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let err = error_from_body(status, &body);
        tracing::warn!(status, kind = %err.kind(), "YouTube API error");
        Err(err)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let resp = self
            .http
            .get(format!("{}/{resource}", self.base_url))
            .header("Authorization", self.auth_header())
            .query(query)
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        resp.json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Build an [`ApiError`] from a non-success status and its body.
pub(crate) fn error_from_body(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => ApiError::Api {
            status,
            reason: env.error.errors.into_iter().find_map(|d| d.reason),
            message: env.error.message,
        },
        Err(_) => ApiError::Api {
            status,
            reason: None,
            message: body.to_string(),
        },
    }
}

impl CatalogService for YoutubeClient {
    async fn list_owned_playlists(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<PlaylistSummary>, ApiError> {
        let max_results = MAX_RESULTS.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("mine", "true"),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let resp: ListResponse<PlaylistResource> = self.get_json("playlists", &query).await?;
        Ok(resp.into_page(|p| Some(p.into_summary())))
    }

    async fn resolve_upload_feed(&self, channel_id: &str) -> Result<String, ApiError> {
        let resp: ListResponse<ChannelResource> = self
            .get_json("channels", &[("part", "contentDetails"), ("id", channel_id)])
            .await?;

        resp.items
            .into_iter()
            .next()
            .and_then(|c| c.content_details.related_playlists.uploads)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::NotFound(format!("channel {channel_id}")))
    }

    async fn list_upload_feed(
        &self,
        feed_id: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<Page<FeedItem>, ApiError> {
        let max_results = page_size.clamp(1, MAX_RESULTS).to_string();
        let mut query = vec![
            ("part", "snippet,contentDetails"),
            ("playlistId", feed_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let resp: ListResponse<PlaylistItemResource> =
            self.get_json("playlistItems", &query).await?;
        Ok(resp.into_page(PlaylistItemResource::into_feed_item))
    }

    async fn is_member(&self, video_id: &str, playlist_id: &str) -> Result<bool, ApiError> {
        let resp: ListResponse<PlaylistItemResource> = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "id"),
                    ("playlistId", playlist_id),
                    ("videoId", video_id),
                    ("maxResults", "1"),
                ],
            )
            .await?;
        Ok(!resp.items.is_empty())
    }

    async fn insert_member(&self, video_id: &str, playlist_id: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(format!("{}/playlistItems", self.base_url))
            .header("Authorization", self.auth_header())
            .query(&[("part", "snippet")])
            .json(&InsertPlaylistItem::video(video_id, playlist_id))
            .send()
            .await?;

        Self::check_response(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_error_from_google_envelope() {
        let body = r#"{"error": {"code": 403, "message": "Quota Exceeded", "errors": [{"reason": "quotaExceeded"}]}}"#;
        let err = error_from_body(403, body);
        assert_eq!(err.kind(), ErrorKind::Quota);
        assert_eq!(err.to_string(), "API error (status 403): Quota Exceeded");
    }

    #[test]
    fn test_error_from_auth_failure() {
        let body = r#"{"error": {"code": 401, "message": "Invalid Credentials", "errors": [{"reason": "authError"}]}}"#;
        assert_eq!(error_from_body(401, body).kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_error_from_plain_body() {
        let err = error_from_body(502, "Bad Gateway");
        match &err {
            ApiError::Api {
                status,
                reason,
                message,
            } => {
                assert_eq!(*status, 502);
                assert!(reason.is_none());
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Service);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = YoutubeClient::new("token".into())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let err = client.list_owned_playlists(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
