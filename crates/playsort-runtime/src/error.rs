use playsort_api::ApiError;
use playsort_core::error::PlaysortError;

use crate::sync::SyncPhase;

/// Fatal conditions that abort a run before the watermark is written.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no target channel configured (set sync.channel_id or TARGET_CHANNEL_ID)")]
    MissingChannel,

    #[error("channel not found: {channel_id}")]
    ChannelNotFound { channel_id: String },

    #[error("credentials unavailable: {0}")]
    Credentials(#[source] ApiError),

    #[error("rules error: {0}")]
    Rules(#[source] PlaysortError),

    #[error("config error: {0}")]
    Config(#[source] PlaysortError),

    #[error("{phase} failed: {source}")]
    Api {
        phase: SyncPhase,
        #[source]
        source: ApiError,
    },

    #[error("{phase} failed: {source}")]
    State {
        phase: SyncPhase,
        #[source]
        source: PlaysortError,
    },
}
