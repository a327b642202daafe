//! Wiring between config, credentials, the YouTube client and the sync run.

pub mod context;
pub mod error;
pub mod mutation;
pub mod sync;

#[cfg(test)]
mod testing;

use std::path::PathBuf;

use tracing::info;

use playsort_api::traits::CredentialProvider;
use playsort_api::youtube::auth::authorize;
use playsort_api::youtube::{ClientSecrets, TokenFileProvider, YoutubeClient};
use playsort_core::config::AppConfig;
use playsort_core::matcher::{classify_video, ClassificationResult};
use playsort_core::models::PlaylistIndex;
use playsort_core::rules::RuleSet;
use playsort_core::storage::open_store;

pub use context::{Clock, SyncContext, SyncOptions, SystemClock};
pub use error::SyncError;
pub use mutation::{ensure_in_playlist, Membership};
pub use sync::{run_sync, RunReport, SyncPhase, VideoOutcome};

/// Long-lived handle on the loaded configuration.
pub struct Runtime {
    config: AppConfig,
}

impl Runtime {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load and validate the rule file.
    pub fn rules(&self) -> Result<RuleSet, SyncError> {
        RuleSet::load(&self.config.rules_path()).map_err(SyncError::Rules)
    }

    /// Run one sync against the configured channel.
    pub async fn sync(&self) -> Result<RunReport, SyncError> {
        let rules = self.rules()?;
        let options = SyncOptions::from_config(&self.config.sync)?;
        let client = self.client().await?;

        let store = open_store(self.config.state.backend, &self.config.state_path()).map_err(
            |e| SyncError::State {
                phase: SyncPhase::FetchCandidates,
                source: e,
            },
        )?;
        let clock = SystemClock;
        let ctx = SyncContext::new(&client, store.as_ref(), &clock, &options.channel_id);

        run_sync(&ctx, &rules, &options).await
    }

    /// Classify a single title against the live playlist index.
    pub async fn classify(&self, title: &str) -> Result<ClassificationResult, SyncError> {
        let rules = self.rules()?;
        let client = self.client().await?;
        let index = self.playlists(&client).await?;
        Ok(classify_video(title, &rules, &index))
    }

    /// Run the browser consent flow and write the token file.
    pub async fn authorize(&self) -> Result<PathBuf, SyncError> {
        let secrets =
            ClientSecrets::load(&self.config.client_secrets_path()).map_err(SyncError::Credentials)?;
        let token = authorize(&secrets).await.map_err(SyncError::Credentials)?;

        let path = self.config.token_path();
        token.save(&path).map_err(SyncError::Credentials)?;
        info!(path = %path.display(), "Saved credentials");
        Ok(path)
    }

    async fn client(&self) -> Result<YoutubeClient, SyncError> {
        let token = TokenFileProvider::new(self.config.token_path())
            .access_token()
            .await
            .map_err(SyncError::Credentials)?;
        YoutubeClient::new(token).map_err(SyncError::Credentials)
    }

    async fn playlists(&self, client: &YoutubeClient) -> Result<PlaylistIndex, SyncError> {
        sync::build_playlist_index(client)
            .await
            .map_err(|e| SyncError::Api {
                phase: SyncPhase::FetchPlaylists,
                source: e,
            })
    }
}
