use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::auth::{self, DEFAULT_TOKEN_URI};
use crate::error::ApiError;
use crate::traits::CredentialProvider;

/// Tokens are refreshed this long before their recorded expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Stored OAuth credentials, in Google's authorized-user file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenFile {
    pub token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl TokenFile {
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ApiError::Auth(format!(
                "cannot read {}: {e}; run `playsort authorize` first",
                path.display()
            ))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Auth(format!("malformed token file {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), ApiError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ApiError::Parse(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Whether the access token is expired (or about to be) at `now`.
    ///
    /// A token without a recorded expiry is assumed valid; an unparseable
    /// expiry is treated as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.expiry {
            None => false,
            Some(expiry) => match DateTime::parse_from_rfc3339(expiry) {
                Ok(at) => at.with_timezone(&Utc) - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
                Err(_) => true,
            },
        }
    }
}

/// Credential provider backed by a token file on disk.
///
/// Expired tokens are refreshed and written back to the same file.
pub struct TokenFileProvider {
    path: PathBuf,
}

impl TokenFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn refresh(&self, mut token: TokenFile) -> Result<TokenFile, ApiError> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            token.refresh_token.as_deref(),
            token.client_id.as_deref(),
            token.client_secret.as_deref(),
        ) else {
            return Err(ApiError::Auth(
                "token expired and cannot be refreshed; run `playsort authorize`".into(),
            ));
        };

        tracing::info!("Refreshing expired access token");
        let resp = auth::refresh(&token.token_uri, client_id, client_secret, refresh_token).await?;

        token.expiry = resp.expiry();
        token.token = resp.access_token;
        if let Some(rotated) = resp.refresh_token {
            token.refresh_token = Some(rotated);
        }
        token.save(&self.path)?;
        Ok(token)
    }
}

impl CredentialProvider for TokenFileProvider {
    async fn access_token(&self) -> Result<String, ApiError> {
        let token = TokenFile::load(&self.path)?;
        if !token.is_expired(Utc::now()) {
            return Ok(token.token);
        }
        let token = self.refresh(token).await?;
        Ok(token.token)
    }
}
