use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaysortError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid rules: {0}")]
    Rules(String),

    #[error("invalid timestamp: {0:?}")]
    Timestamp(String),

    #[error("state error: {0}")]
    State(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
