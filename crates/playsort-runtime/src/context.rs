use chrono::{DateTime, Utc};
use tracing::Span;

use playsort_core::config::SyncConfig;
use playsort_core::storage::WatermarkStore;

use crate::error::SyncError;

/// Source of the current time for run reports.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Everything one sync run talks to: the catalog, the watermark store, the
/// clock and the tracing span the run logs under.
pub struct SyncContext<'a, C> {
    pub catalog: &'a C,
    pub store: &'a dyn WatermarkStore,
    pub clock: &'a dyn Clock,
    pub span: Span,
}

impl<'a, C> SyncContext<'a, C> {
    pub fn new(
        catalog: &'a C,
        store: &'a dyn WatermarkStore,
        clock: &'a dyn Clock,
        channel_id: &str,
    ) -> Self {
        Self {
            catalog,
            store,
            clock,
            span: tracing::info_span!("sync", channel_id = %channel_id),
        }
    }
}

/// Per-run inputs taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub channel_id: String,
    /// Maximum new insertions per run; `None` disables the cap.
    pub processing_cap: Option<usize>,
    pub feed_page_size: u32,
    pub feed_max_pages: u32,
}

impl SyncOptions {
    pub const DEFAULT_PROCESSING_CAP: usize = 10;

    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            processing_cap: Some(Self::DEFAULT_PROCESSING_CAP),
            feed_page_size: 20,
            feed_max_pages: 1,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        let channel_id = config.channel_id().ok_or(SyncError::MissingChannel)?;
        Ok(Self {
            channel_id: channel_id.to_string(),
            processing_cap: config.processing_cap(),
            feed_page_size: config.feed_page_size.max(1),
            feed_max_pages: config.feed_max_pages.max(1),
        })
    }
}
