//! In-memory collaborators for orchestrator tests.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use playsort_api::traits::{CatalogService, FeedItem, Page, PlaylistSummary};
use playsort_api::ApiError;
use playsort_core::error::PlaysortError;
use playsort_core::models::Watermark;
use playsort_core::storage::WatermarkStore;

use crate::context::Clock;

pub const CHANNEL: &str = "UC_TARGET";
const UPLOADS: &str = "UU_TARGET";

#[derive(Default)]
struct CatalogState {
    playlists: Vec<PlaylistSummary>,
    playlist_page_size: Option<usize>,
    cycle_playlist_pages: bool,
    fail_playlists: bool,
    playlist_calls: usize,
    feed: Vec<FeedItem>,
    members: HashSet<(String, String)>,
    inserted: Vec<(String, String)>,
    fail_membership: bool,
    fail_inserts: HashSet<String>,
}

/// A catalog with one channel (`UC_TARGET`) whose feed and playlists live
/// in memory. Page tokens are stringified offsets.
#[derive(Default)]
pub struct FakeCatalog {
    state: Mutex<CatalogState>,
}

fn api_error(status: u16, reason: &str) -> ApiError {
    ApiError::Api {
        status,
        reason: Some(reason.to_string()),
        message: reason.to_string(),
    }
}

fn paginate<T: Clone>(items: &[T], page_token: Option<&str>, size: usize) -> Page<T> {
    let offset: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
    let end = (offset + size).min(items.len());
    Page {
        items: items[offset.min(end)..end].to_vec(),
        next_page_token: (end < items.len()).then(|| end.to_string()),
    }
}

impl FakeCatalog {
    pub fn with_playlists(playlists: &[(&str, &str)]) -> Self {
        let catalog = Self::default();
        catalog.state.lock().unwrap().playlists = playlists
            .iter()
            .map(|(title, id)| PlaylistSummary {
                id: id.to_string(),
                title: title.to_string(),
            })
            .collect();
        catalog
    }

    pub fn set_playlist_page_size(&self, size: usize) {
        self.state.lock().unwrap().playlist_page_size = Some(size);
    }

    /// Make the last playlist page point back to the first one.
    pub fn cycle_playlist_pages(&self) {
        self.state.lock().unwrap().cycle_playlist_pages = true;
    }

    pub fn push_playlist(&self, title: &str, id: &str) {
        self.state.lock().unwrap().playlists.push(PlaylistSummary {
            id: id.to_string(),
            title: title.to_string(),
        });
    }

    /// Append an upload to the feed. Call in the order the service returns
    /// them (typically newest first).
    pub fn upload(&self, video_id: &str, title: &str, published_at: &str) {
        self.state.lock().unwrap().feed.push(FeedItem {
            video_id: video_id.to_string(),
            title: title.to_string(),
            published_at: published_at.to_string(),
        });
    }

    pub fn add_member(&self, video_id: &str, playlist_id: &str) {
        self.state
            .lock()
            .unwrap()
            .members
            .insert((video_id.to_string(), playlist_id.to_string()));
    }

    pub fn fail_playlist_listing(&self) {
        self.state.lock().unwrap().fail_playlists = true;
    }

    pub fn fail_membership_checks(&self) {
        self.state.lock().unwrap().fail_membership = true;
    }

    pub fn fail_inserts_for(&self, video_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_inserts
            .insert(video_id.to_string());
    }

    pub fn contains(&self, video_id: &str, playlist_id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .members
            .contains(&(video_id.to_string(), playlist_id.to_string()))
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().inserted.len()
    }

    /// Successful inserts as `(video_id, playlist_id)`, in call order.
    pub fn inserted(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().inserted.clone()
    }

    pub fn playlist_calls(&self) -> usize {
        self.state.lock().unwrap().playlist_calls
    }
}

impl CatalogService for FakeCatalog {
    async fn list_owned_playlists(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<PlaylistSummary>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.playlist_calls += 1;
        if state.fail_playlists {
            return Err(api_error(403, "quotaExceeded"));
        }
        let size = state.playlist_page_size.unwrap_or(50);
        let mut page = paginate(&state.playlists, page_token, size);
        if state.cycle_playlist_pages && page.next_page_token.is_none() {
            page.next_page_token = Some("0".to_string());
        }
        Ok(page)
    }

    async fn resolve_upload_feed(&self, channel_id: &str) -> Result<String, ApiError> {
        if channel_id == CHANNEL {
            Ok(UPLOADS.to_string())
        } else {
            Err(ApiError::NotFound(format!("channel {channel_id}")))
        }
    }

    async fn list_upload_feed(
        &self,
        feed_id: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<Page<FeedItem>, ApiError> {
        assert_eq!(feed_id, UPLOADS);
        let state = self.state.lock().unwrap();
        Ok(paginate(&state.feed, page_token, page_size as usize))
    }

    async fn is_member(&self, video_id: &str, playlist_id: &str) -> Result<bool, ApiError> {
        let state = self.state.lock().unwrap();
        if state.fail_membership {
            return Err(api_error(500, "backendError"));
        }
        Ok(state
            .members
            .contains(&(video_id.to_string(), playlist_id.to_string())))
    }

    async fn insert_member(&self, video_id: &str, playlist_id: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_inserts.contains(video_id) {
            return Err(api_error(401, "authError"));
        }
        let key = (video_id.to_string(), playlist_id.to_string());
        state.members.insert(key.clone());
        state.inserted.push(key);
        Ok(())
    }
}

/// Watermark store backed by a mutex.
#[derive(Default)]
pub struct MemoryStore {
    watermark: Mutex<Option<Watermark>>,
    writes: Mutex<usize>,
    fail_writes: Mutex<bool>,
    fail_reads: Mutex<bool>,
}

impl MemoryStore {
    pub fn at(watermark: &str) -> Self {
        let store = Self::default();
        *store.watermark.lock().unwrap() = Some(Watermark::parse(watermark).unwrap());
        store
    }

    pub fn current(&self) -> Watermark {
        self.watermark.lock().unwrap().clone().unwrap_or_default()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub fn fail_reads(&self) {
        *self.fail_reads.lock().unwrap() = true;
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }
}

impl WatermarkStore for MemoryStore {
    fn read(&self) -> Result<Watermark, PlaysortError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(PlaysortError::State("corrupt state".into()));
        }
        Ok(self.current())
    }

    fn write(&self, watermark: &Watermark) -> Result<(), PlaysortError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(PlaysortError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )));
        }
        *self.watermark.lock().unwrap() = Some(watermark.clone());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(
            DateTime::parse_from_rfc3339("2026-01-15T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
