//! Durable watermark stores.
//!
//! Two backends are available: a JSON state file compatible with the
//! legacy `state.json` layout, and a single-row SQLite table.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::config::StateBackend;
use crate::error::PlaysortError;
use crate::models::Watermark;

const SCHEMA: &str = include_str!("../../../migrations/001_state.sql");

/// Reads and writes the persisted watermark.
///
/// Implementations do no locking across processes; callers must not run
/// two syncs against the same store at once.
pub trait WatermarkStore: Send + Sync {
    /// The persisted watermark, or [`Watermark::epoch`] if none was written yet.
    fn read(&self) -> Result<Watermark, PlaysortError>;

    fn write(&self, watermark: &Watermark) -> Result<(), PlaysortError>;
}

/// Open the store selected in config.
pub fn open_store(
    backend: StateBackend,
    path: &Path,
) -> Result<Box<dyn WatermarkStore>, PlaysortError> {
    match backend {
        StateBackend::Json => Ok(Box::new(JsonStateFile::new(path))),
        StateBackend::Sqlite => Ok(Box::new(SqliteStateStore::open(path)?)),
    }
}

// ── JSON state file ─────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    last_published_at: Option<Watermark>,
}

/// `{"last_published_at": "..."}` on disk.
#[derive(Debug, Clone)]
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WatermarkStore for JsonStateFile {
    fn read(&self) -> Result<Watermark, PlaysortError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No state file, starting from epoch");
            return Ok(Watermark::epoch());
        }
        let text = std::fs::read_to_string(&self.path)?;
        let doc: StateDocument = serde_json::from_str(&text).map_err(|e| {
            PlaysortError::State(format!("malformed state file {}: {e}", self.path.display()))
        })?;
        Ok(doc.last_published_at.unwrap_or_default())
    }

    fn write(&self, watermark: &Watermark) -> Result<(), PlaysortError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let doc = StateDocument {
            last_published_at: Some(watermark.clone()),
        };
        // Write-then-rename so a crash never leaves a truncated state file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string(&doc)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// ── SQLite state store ──────────────────────────────────────────

/// SQLite-backed watermark store.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, PlaysortError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, PlaysortError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PlaysortError> {
        self.conn
            .lock()
            .map_err(|_| PlaysortError::State("state database lock poisoned".into()))
    }
}

impl WatermarkStore for SqliteStateStore {
    fn read(&self) -> Result<Watermark, PlaysortError> {
        let stored: Option<String> = self
            .conn()?
            .query_row(
                "SELECT last_published_at FROM sync_state WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            Some(text) => Watermark::parse(text),
            None => Ok(Watermark::epoch()),
        }
    }

    fn write(&self, watermark: &Watermark) -> Result<(), PlaysortError> {
        self.conn()?.execute(
            "INSERT INTO sync_state (id, last_published_at, updated_at)
             VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
               last_published_at = excluded.last_published_at,
               updated_at = excluded.updated_at",
            params![watermark.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
