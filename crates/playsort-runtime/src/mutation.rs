use tracing::{debug, warn};

use playsort_api::traits::CatalogService;
use playsort_api::ApiError;

/// How a video ended up in its playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// The video was inserted by this call.
    Inserted,
    /// The video was already in the playlist; nothing was sent.
    AlreadyPresent,
}

/// Make sure `video_id` is in `playlist_id`, inserting it at most once.
///
/// A failed membership lookup is treated as "absent" and the insert goes
/// ahead: a duplicate playlist entry is cheaper than a stalled pipeline.
/// Insert failures are returned to the caller.
pub async fn ensure_in_playlist<C: CatalogService>(
    catalog: &C,
    video_id: &str,
    playlist_id: &str,
) -> Result<Membership, ApiError> {
    match catalog.is_member(video_id, playlist_id).await {
        Ok(true) => {
            debug!(video_id, playlist_id, "Already in playlist, skipping insert");
            return Ok(Membership::AlreadyPresent);
        }
        Ok(false) => {}
        Err(e) => {
            warn!(
                video_id,
                playlist_id,
                kind = %e.kind(),
                error = %e,
                "Membership check failed, assuming absent"
            );
        }
    }

    catalog.insert_member(video_id, playlist_id).await?;
    Ok(Membership::Inserted)
}
