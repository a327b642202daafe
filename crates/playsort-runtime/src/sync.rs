//! One incremental sync run.
//!
//! A run moves through [`SyncPhase`]s in order. Fatal errors end it with a
//! [`SyncError`] before anything is persisted, so the next run starts over
//! from the last durably written watermark.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};

use playsort_api::traits::CatalogService;
use playsort_api::{ApiError, ErrorKind};
use playsort_core::matcher::{classify_video, ClassificationResult};
use playsort_core::models::{PlaylistIndex, Timestamp, Video, Watermark};
use playsort_core::rules::RuleSet;

use crate::context::{SyncContext, SyncOptions};
use crate::error::SyncError;
use crate::mutation::{ensure_in_playlist, Membership};

/// Stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncPhase {
    FetchPlaylists,
    FetchCandidates,
    ClassifyAndApply,
    Persist,
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FetchPlaylists => "fetch playlists",
            Self::FetchCandidates => "fetch candidates",
            Self::ClassifyAndApply => "classify and apply",
            Self::Persist => "persist",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// What happened to one examined video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VideoOutcome {
    Inserted { playlist_id: String, keyword: String },
    AlreadyPresent { playlist_id: String, keyword: String },
    Unmatched,
    Failed { playlist_id: String, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExaminedVideo {
    pub video_id: String,
    pub title: String,
    pub published_at: Timestamp,
    #[serde(flatten)]
    pub outcome: VideoOutcome,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub playlists: usize,
    /// Feed entries newer than the starting watermark.
    pub candidates: usize,
    pub examined: Vec<ExaminedVideo>,
    pub cap_reached: bool,
    pub watermark_before: Watermark,
    pub watermark_after: Watermark,
}

impl RunReport {
    fn count(&self, pred: impl Fn(&VideoOutcome) -> bool) -> usize {
        self.examined.iter().filter(|v| pred(&v.outcome)).count()
    }

    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Inserted { .. }))
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::AlreadyPresent { .. }))
    }

    pub fn unmatched(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Unmatched))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Failed { .. }))
    }
}

/// Page through every playlist the authenticated user owns.
pub async fn build_playlist_index<C: CatalogService>(catalog: &C) -> Result<PlaylistIndex, ApiError> {
    let mut index = PlaylistIndex::new();
    let mut page_token: Option<String> = None;
    let mut seen_tokens = HashSet::new();

    loop {
        let page = catalog.list_owned_playlists(page_token.as_deref()).await?;
        index.extend(page.items.into_iter().map(|p| (p.title, p.id)));

        match page.next_page_token {
            Some(next) if !seen_tokens.insert(next.clone()) => {
                warn!(token = %next, "Playlist listing revisited a page token, stopping");
                break;
            }
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    Ok(index)
}

/// Read the lookback window of the channel's upload feed and keep the
/// videos published after `watermark`, oldest first.
pub async fn fetch_candidates<C: CatalogService>(
    catalog: &C,
    options: &SyncOptions,
    watermark: &Watermark,
) -> Result<Vec<Video>, SyncError> {
    let feed_id = catalog
        .resolve_upload_feed(&options.channel_id)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => SyncError::ChannelNotFound {
                channel_id: options.channel_id.clone(),
            },
            _ => SyncError::Api {
                phase: SyncPhase::FetchCandidates,
                source: e,
            },
        })?;

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..options.feed_max_pages {
        let page = catalog
            .list_upload_feed(&feed_id, page_token.as_deref(), options.feed_page_size)
            .await
            .map_err(|e| SyncError::Api {
                phase: SyncPhase::FetchCandidates,
                source: e,
            })?;

        for item in page.items {
            let published_at = match Timestamp::parse(item.published_at) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(video_id = %item.video_id, error = %e, "Skipping feed item with bad timestamp");
                    continue;
                }
            };
            if published_at <= *watermark || !seen.insert(item.video_id.clone()) {
                continue;
            }
            candidates.push(Video {
                id: item.video_id,
                title: item.title,
                published_at,
            });
        }

        match page.next_page_token {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    // The feed is newest first; processing must be chronological.
    candidates.sort_by(|a, b| a.published_at.cmp(&b.published_at));
    Ok(candidates)
}

/// Run one sync end to end.
pub async fn run_sync<C: CatalogService>(
    ctx: &SyncContext<'_, C>,
    rules: &RuleSet,
    options: &SyncOptions,
) -> Result<RunReport, SyncError> {
    let span = ctx.span.clone();
    run_phases(ctx, rules, options).instrument(span).await
}

async fn run_phases<C: CatalogService>(
    ctx: &SyncContext<'_, C>,
    rules: &RuleSet,
    options: &SyncOptions,
) -> Result<RunReport, SyncError> {
    let started_at = ctx.clock.now();

    // ── FetchPlaylists ──────────────────────────────────────────
    debug!(phase = %SyncPhase::FetchPlaylists, "Fetching playlists for keyword matching");
    let index = match build_playlist_index(ctx.catalog).await {
        Ok(index) => index,
        Err(e) => {
            warn!(
                kind = %e.kind(),
                error = %e,
                "Failed to list playlists, continuing with an empty index"
            );
            PlaylistIndex::new()
        }
    };
    info!(playlists = index.len(), rules = rules.len(), "Playlist index ready");

    // ── FetchCandidates ─────────────────────────────────────────
    let watermark_before = ctx.store.read().map_err(|e| SyncError::State {
        phase: SyncPhase::FetchCandidates,
        source: e,
    })?;
    let candidates = fetch_candidates(ctx.catalog, options, &watermark_before).await?;
    info!(
        candidates = candidates.len(),
        watermark = %watermark_before,
        "Fetched upload feed"
    );

    // ── ClassifyAndApply ────────────────────────────────────────
    let mut watermark = watermark_before.clone();
    let mut examined = Vec::new();
    let mut inserted = 0usize;
    let mut cap_reached = false;

    for video in &candidates {
        if options.processing_cap.is_some_and(|cap| inserted >= cap) {
            cap_reached = true;
            // The next run only sees videos strictly newer than the
            // watermark, so a group sharing its timestamp must be finished.
            if video.published_at != watermark {
                info!(
                    cap = ?options.processing_cap,
                    remaining = candidates.len() - examined.len(),
                    "Processing cap reached, deferring remaining videos"
                );
                break;
            }
        }

        let outcome = apply(ctx.catalog, video, rules, &index).await;
        if matches!(outcome, VideoOutcome::Inserted { .. }) {
            inserted += 1;
        }

        // Examined, whatever the outcome: never look at it again.
        if video.published_at > watermark {
            watermark = video.published_at.clone();
        }
        examined.push(ExaminedVideo {
            video_id: video.id.clone(),
            title: video.title.clone(),
            published_at: video.published_at.clone(),
            outcome,
        });
    }

    // ── Persist ─────────────────────────────────────────────────
    if watermark != watermark_before {
        ctx.store.write(&watermark).map_err(|e| SyncError::State {
            phase: SyncPhase::Persist,
            source: e,
        })?;
    }

    let report = RunReport {
        started_at,
        finished_at: ctx.clock.now(),
        playlists: index.len(),
        candidates: candidates.len(),
        examined,
        cap_reached,
        watermark_before,
        watermark_after: watermark,
    };
    info!(
        phase = %SyncPhase::Done,
        inserted = report.inserted(),
        already_present = report.already_present(),
        unmatched = report.unmatched(),
        failed = report.failed(),
        watermark = %report.watermark_after,
        "Sync complete"
    );
    Ok(report)
}

/// Classify one video and, if it has a destination, put it there.
async fn apply<C: CatalogService>(
    catalog: &C,
    video: &Video,
    rules: &RuleSet,
    index: &PlaylistIndex,
) -> VideoOutcome {
    let (playlist_id, keyword) = match classify_video(&video.title, rules, index) {
        ClassificationResult::Matched {
            playlist_id,
            keyword,
        } => (playlist_id, keyword),
        ClassificationResult::Unmatched => {
            info!(video_id = %video.id, title = %video.title, "No matching rule or playlist");
            return VideoOutcome::Unmatched;
        }
    };

    info!(video_id = %video.id, title = %video.title, %keyword, %playlist_id, "Matched");
    match ensure_in_playlist(catalog, &video.id, &playlist_id).await {
        Ok(Membership::Inserted) => {
            info!(video_id = %video.id, %playlist_id, "Added to playlist");
            VideoOutcome::Inserted {
                playlist_id,
                keyword,
            }
        }
        Ok(Membership::AlreadyPresent) => VideoOutcome::AlreadyPresent {
            playlist_id,
            keyword,
        },
        Err(e) => {
            warn!(
                video_id = %video.id,
                %playlist_id,
                kind = %e.kind(),
                error = %e,
                "Failed to add video to playlist"
            );
            VideoOutcome::Failed {
                playlist_id,
                error: e.to_string(),
            }
        }
    }
}
