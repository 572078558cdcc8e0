//! Shared SQLite handle.
//!
//! One connection is opened at startup and shared by every repository. Each
//! repository creates its own tables when constructed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the database lives, parsed from the configured connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Accepts a bare path, a `sqlite://` URL, or `:memory:`. `~` is expanded.
    pub fn parse(url: &str) -> Result<Self> {
        let raw = url.trim();
        let raw = raw.strip_prefix("sqlite://").unwrap_or(raw);
        if raw.is_empty() {
            anyhow::bail!("database_url is empty");
        }
        if raw == ":memory:" {
            return Ok(Self::Memory);
        }
        let expanded = shellexpand::full(raw)
            .with_context(|| format!("failed to expand database path {raw}"))?;
        Ok(Self::File(PathBuf::from(expanded.as_ref())))
    }
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(url: &str) -> Result<Self> {
        match DatabaseLocation::parse(url)? {
            DatabaseLocation::Memory => Self::open_in_memory(),
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
                let conn = Connection::open(&path)
                    .with_context(|| format!("failed to open database at {}", path.display()))?;

                // WAL mode for concurrent reads + crash safety
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;",
                )?;
                tracing::info!(path = %path.display(), "Database opened");
                Ok(Self::from_connection(conn))
            }
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

/// Current time at the millisecond precision that is stored.
pub(crate) fn now() -> DateTime<Utc> {
    from_millis(to_millis(Utc::now()))
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
