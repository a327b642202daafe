use thiserror::Error;

/// Coarse classification of a collaborator failure.
///
/// The sync orchestrator logs and branches on this rather than on the
/// transport-specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, expired or rejected credentials.
    Auth,
    /// Quota or rate limit exhausted.
    Quota,
    /// Connection failure or timeout.
    Network,
    /// The requested resource does not exist.
    NotFound,
    /// Any other error status from the service.
    Service,
    /// The response could not be decoded.
    Parse,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auth => "auth",
            Self::Quota => "quota",
            Self::Network => "network",
            Self::NotFound => "not_found",
            Self::Service => "service",
            Self::Parse => "parse",
        };
        f.write_str(s)
    }
}

/// Errors from the remote catalog and credential collaborators.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        reason: Option<String>,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Google error reasons that mean quota or rate limiting.
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
];

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(e) if e.is_decode() => ErrorKind::Parse,
            Self::Http(_) | Self::Io(_) => ErrorKind::Network,
            Self::Auth(_) => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Api { status, reason, .. } => {
                let quota = reason
                    .as_deref()
                    .is_some_and(|r| QUOTA_REASONS.contains(&r));
                match status {
                    _ if quota => ErrorKind::Quota,
                    429 => ErrorKind::Quota,
                    401 | 403 => ErrorKind::Auth,
                    404 => ErrorKind::NotFound,
                    _ => ErrorKind::Service,
                }
            }
        }
    }
}
