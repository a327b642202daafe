use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::path::Path;

use chrono::{Duration, Utc};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use super::token::TokenFile;
use crate::error::ApiError;

const VERIFIER_LEN: usize = 128;
const STATE_LEN: usize = 32;

/// Unreserved characters minus `.` and `~`: 64 symbols, one per 6 bits.
const TOKEN_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Scope needed to read playlists and insert playlist items.
pub const SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub(crate) const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// An OAuth client from a Google Cloud `client_secrets.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a downloaded client secrets document (`installed` or `web`).
    pub fn from_json(s: &str) -> Result<Self, ApiError> {
        let file: SecretsFile =
            serde_json::from_str(s).map_err(|e| ApiError::Parse(e.to_string()))?;
        file.installed
            .or(file.web)
            .ok_or_else(|| ApiError::Parse("client secrets have no 'installed' or 'web' client".into()))
    }

    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ApiError::Auth(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    #[allow(dead_code)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Absolute expiry for this token, formatted as RFC 3339.
    pub fn expiry(&self) -> Option<String> {
        self.expires_in
            .map(|secs| (Utc::now() + Duration::seconds(secs)).to_rfc3339())
    }
}

/// Run the installed-app OAuth2 flow with a PKCE verifier.
///
/// 1. Bind a one-shot listener on a free localhost port.
/// 2. Open the browser to the Google consent page.
/// 3. Wait for the redirect with `?code=...`.
/// 4. Exchange the code for tokens.
pub async fn authorize(secrets: &ClientSecrets) -> Result<TokenFile, ApiError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| ApiError::Auth(format!("failed to bind localhost: {e}")))?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://127.0.0.1:{port}");

    let verifier = random_token(VERIFIER_LEN);
    let state = random_token(STATE_LEN);

    let auth_url = Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("scope", SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("code_challenge", verifier.as_str()),
            ("code_challenge_method", "plain"),
            ("state", state.as_str()),
        ],
    )
    .map_err(|e| ApiError::Auth(format!("invalid auth_uri: {e}")))?;

    tracing::info!("Opening Google authorization URL in browser");
    if let Err(e) = open::that(auth_url.as_str()) {
        tracing::warn!(error = %e, "Failed to open browser");
        println!("Open this URL to authorize playsort:\n\n{auth_url}\n");
    }

    let code = listen_for_redirect(&listener, &state).await?;
    let resp = exchange_code(secrets, &code, &verifier, &redirect_uri).await?;

    Ok(TokenFile {
        expiry: resp.expiry(),
        token: resp.access_token,
        refresh_token: resp.refresh_token,
        token_uri: secrets.token_uri.clone(),
        client_id: Some(secrets.client_id.clone()),
        client_secret: Some(secrets.client_secret.clone()),
        scopes: resp
            .scope
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_else(|| vec![SCOPE.to_string()]),
    })
}

/// Exchange a refresh token for a fresh access token.
pub async fn refresh(
    token_uri: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenResponse, ApiError> {
    let http = reqwest::Client::new();
    let resp = http
        .post(token_uri)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await?;

    token_response(resp).await
}

// ── Internals ───────────────────────────────────────────────────

async fn token_response(resp: reqwest::Response) -> Result<TokenResponse, ApiError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        // The token endpoint answers 400 `invalid_grant` for revoked or
        // expired refresh tokens.
        return Err(ApiError::Auth(format!("token endpoint returned {status}: {body}")));
    }

    resp.json::<TokenResponse>()
        .await
        .map_err(|e| ApiError::Parse(e.to_string()))
}

/// A random string of `len` URL-safe characters, usable as a PKCE
/// verifier or an OAuth `state`.
///
/// Each `RandomState` is freshly keyed by the OS, so every hasher yields an
/// independent 64-bit word; ten 6-bit symbols are taken from each.
fn random_token(len: usize) -> String {
    let mut out = String::with_capacity(len);
    let mut word_index = 0u64;
    while out.len() < len {
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u64(word_index);
        let mut word = hasher.finish();
        word_index += 1;

        for _ in 0..10 {
            if out.len() == len {
                break;
            }
            out.push(TOKEN_ALPHABET[(word & 0x3f) as usize] as char);
            word >>= 6;
        }
    }
    out
}

/// Accept one connection on `listener`, answer it, and return the `code`
/// from the redirect after checking `state`.
async fn listen_for_redirect(listener: &TcpListener, state: &str) -> Result<String, ApiError> {
    tracing::info!(addr = ?listener.local_addr().ok(), "Waiting for OAuth redirect");

    let (mut stream, _) = listener
        .accept()
        .await
        .map_err(|e| ApiError::Auth(format!("failed to accept redirect: {e}")))?;

    let mut buf = vec![0u8; 4096];
    let n = stream
        .read(&mut buf)
        .await
        .map_err(|e| ApiError::Auth(format!("failed to read redirect: {e}")))?;
    let result = parse_redirect(&String::from_utf8_lossy(&buf[..n]), state);

    let (status, message) = match &result {
        Ok(_) => ("200 OK", "playsort is authorized. You can close this tab."),
        Err(_) => ("400 Bad Request", "Authorization failed. See the playsort output."),
    };
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nConnection: close\r\n\r\n{message}\n"
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!(error = %e, "Failed to answer redirect");
    }

    result
}

/// Extract the authorization code from a raw redirect request.
fn parse_redirect(request: &str, expected_state: &str) -> Result<String, ApiError> {
    // Request line: "GET /?state=...&code=... HTTP/1.1"
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| ApiError::Auth("malformed HTTP request from redirect".into()))?;

    let parsed = Url::parse(&format!("http://localhost{path}"))
        .map_err(|e| ApiError::Auth(format!("failed to parse redirect URL: {e}")))?;
    let param = |name: &str| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if let Some(error) = param("error") {
        return Err(ApiError::Auth(format!("authorization denied: {error}")));
    }
    if param("state").as_deref() != Some(expected_state) {
        return Err(ApiError::Auth("OAuth state mismatch".into()));
    }
    param("code").ok_or_else(|| ApiError::Auth("no 'code' parameter in redirect".into()))
}

/// Exchange the authorization code for tokens.
async fn exchange_code(
    secrets: &ClientSecrets,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
) -> Result<TokenResponse, ApiError> {
    let http = reqwest::Client::new();
    let resp = http
        .post(&secrets.token_uri)
        .form(&[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await?;

    token_response(resp).await
}
