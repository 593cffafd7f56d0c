//! SQLite-backed local snapshot cache.
//!
//! A single key/value table keyed by [`GameId::cache_key`], holding the
//! JSON-encoded field list. Unreadable or malformed entries count as misses.

use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use tac_core::{validate_layout, Field, GameId};
use tracing::warn;

use crate::error::StoreResult;

/// Local key/value cache for game snapshots.
pub struct LocalCache {
    conn: Mutex<Connection>,
}

impl LocalCache {
    /// Opens a SQLite database at the given path.
    ///
    /// Creates the database and schema if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Creates an in-memory cache.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }

    /// Returns the cached board for `id`, or `None` on a miss.
    pub fn load(&self, id: &GameId) -> Option<Vec<Field>> {
        let key = id.cache_key();
        let raw = match self.load_raw(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(game_id = %id, error = %err, "Failed to read local cache");
                return None;
            }
        };

        let fields: Vec<Field> = match serde_json::from_str(&raw) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(game_id = %id, error = %err, "Ignoring malformed cache entry");
                return None;
            }
        };
        if let Err(err) = validate_layout(&fields) {
            warn!(game_id = %id, error = %err, "Ignoring cache entry with invalid layout");
            return None;
        }
        Some(fields)
    }

    /// Stores the board for `id`, replacing any previous entry.
    pub fn save(&self, id: &GameId, fields: &[Field]) -> StoreResult<()> {
        let value = serde_json::to_string(fields)?;
        self.save_raw(&id.cache_key(), &value)
    }

    /// Stores an arbitrary value under `key`.
    pub fn save_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute(
            "INSERT INTO cache_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Self::now_millis()],
        )?;
        Ok(())
    }

    fn load_raw(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let value = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache").finish_non_exhaustive()
    }
}
