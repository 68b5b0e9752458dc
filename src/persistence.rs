//! Session storage: the `SessionStore` contract and its SQLite and in-memory adapters.

use crate::models::{SessionRecord, Settings};
use chrono::{DateTime, Local};
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to create database directory")]
    DirectoryCreation,
    #[error("Invalid timestamp in history: {0}")]
    InvalidTimestamp(String),
}

/// Persists finished sessions. `load_all` makes no ordering promise.
pub trait SessionStore {
    fn save(&mut self, record: &SessionRecord) -> Result<(), StorageError>;
    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError>;
    /// Removes one stored record equal to `record`.
    fn delete(&mut self, record: &SessionRecord) -> Result<(), StorageError>;
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens the database at the default location, initializing tables if needed.
    pub fn new() -> Result<Self, StorageError> {
        Self::open(&Self::db_path())
    }

    /// Opens (or creates) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_| StorageError::DirectoryCreation)?;
        }

        let conn = Connection::open(path)?;
        Self::initialize_tables(&conn)?;
        tracing::info!(target: "chessbar::storage", path = %path.display(), "Opened session database");

        Ok(Self { conn })
    }

    /// Creates an in-memory database.
    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_tables(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_tables(conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                focus_seconds INTEGER NOT NULL DEFAULT 0,
                distraction_seconds INTEGER NOT NULL DEFAULT 0,
                estimated_seconds INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0
            );
        "#,
        )?;
        Ok(())
    }

    pub fn db_path() -> PathBuf {
        ProjectDirs::from("com", "chessbar", "Chessbar")
            .map(|dirs| dirs.data_dir().join("chessbar.db"))
            .unwrap_or_else(|| PathBuf::from("chessbar.db"))
    }

    /// Loads settings from the database, returning defaults if not found.
    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = 'config'",
                [],
                |row| row.get(0),
            )
            .ok();

        match json {
            Some(j) => Ok(serde_json::from_str(&j)?),
            None => Ok(Settings::default()),
        }
    }

    /// Saves settings to the database.
    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        let json = serde_json::to_string(settings)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES ('config', ?)",
            [&json],
        )?;
        Ok(())
    }
}

impl SessionStore for Database {
    fn save(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO sessions (date, focus_seconds, distraction_seconds, estimated_seconds, completed)
             VALUES (?, ?, ?, ?, ?)",
            params![
                record.date.to_rfc3339(),
                record.focus_seconds as i64,
                record.distraction_seconds as i64,
                record.estimated_seconds as i64,
                record.completed,
            ],
        )?;
        tracing::debug!(target: "chessbar::storage", focus = record.focus_seconds, distraction = record.distraction_seconds, "Saved session");
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, focus_seconds, distraction_seconds, estimated_seconds, completed
             FROM sessions",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (date, focus, distraction, estimated, completed) = row?;
            records.push(SessionRecord {
                date: parse_date(&date)?,
                focus_seconds: focus.max(0) as u64,
                distraction_seconds: distraction.max(0) as u64,
                estimated_seconds: estimated.max(0) as u64,
                completed,
            });
        }
        Ok(records)
    }

    fn delete(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM sessions WHERE id = (
                SELECT id FROM sessions
                WHERE date = ? AND focus_seconds = ? AND distraction_seconds = ?
                  AND estimated_seconds = ? AND completed = ?
                LIMIT 1
            )",
            params![
                record.date.to_rfc3339(),
                record.focus_seconds as i64,
                record.distraction_seconds as i64,
                record.estimated_seconds as i64,
                record.completed,
            ],
        )?;
        Ok(())
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Local>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Local))
        .map_err(|_| StorageError::InvalidTimestamp(raw.to_string()))
}

/// Keeps records in memory only. Used when no database can be opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<SessionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn save(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        Ok(self.records.clone())
    }

    fn delete(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        if let Some(pos) = self.records.iter().position(|r| r == record) {
            self.records.remove(pos);
        }
        Ok(())
    }
}

/// Either backend, picked at startup.
pub enum Store {
    Sqlite(Database),
    Memory(MemoryStore),
}

impl Store {
    /// Settings live next to the history; the in-memory store only has defaults.
    pub fn load_settings(&self) -> Settings {
        match self {
            Self::Sqlite(db) => db.load_settings().unwrap_or_else(|e| {
                tracing::warn!(target: "chessbar::storage", error = %e, "Falling back to default settings");
                Settings::default()
            }),
            Self::Memory(_) => Settings::default(),
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        match self {
            Self::Sqlite(db) => db.save_settings(settings),
            Self::Memory(_) => Ok(()),
        }
    }
}

impl SessionStore for Store {
    fn save(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        match self {
            Self::Sqlite(db) => db.save(record),
            Self::Memory(mem) => mem.save(record),
        }
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        match self {
            Self::Sqlite(db) => db.load_all(),
            Self::Memory(mem) => mem.load_all(),
        }
    }

    fn delete(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        match self {
            Self::Sqlite(db) => db.delete(record),
            Self::Memory(mem) => mem.delete(record),
        }
    }
}
