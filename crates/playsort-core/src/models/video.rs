use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlaysortError;

/// An RFC 3339 timestamp as published by the catalog service.
///
/// The original text is kept verbatim for display and persistence.
/// Equality and ordering use the parsed instant, so offsets and fractional
/// seconds compare chronologically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    text: String,
    instant: DateTime<Utc>,
}

/// The `published_at` of the last examined video, persisted between runs.
pub type Watermark = Timestamp;

impl Timestamp {
    pub const EPOCH: &'static str = "1970-01-01T00:00:00Z";

    /// Validate `s` as RFC 3339 and wrap it unchanged.
    pub fn parse(s: impl Into<String>) -> Result<Self, PlaysortError> {
        let text = s.into();
        let instant = DateTime::parse_from_rfc3339(&text)
            .map_err(|_| PlaysortError::Timestamp(text.clone()))?
            .with_timezone(&Utc);
        Ok(Self { text, instant })
    }

    pub fn epoch() -> Self {
        Self {
            text: Self::EPOCH.to_string(),
            instant: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for Timestamp {}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instant.hash(state);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::epoch()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Timestamp {
    type Err = PlaysortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = PlaysortError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.text
    }
}

/// A video from a channel's upload feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub published_at: Timestamp,
}
