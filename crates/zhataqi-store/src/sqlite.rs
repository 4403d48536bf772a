//! # SQLite Store
//!
//! A [`HistoryStore`] keeping the slot as one row of a key-value table.
//!
//! ## Schema
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ kv_slots                                                     │
//! │ ──────────────────────────────────────────────────────────── │
//! │ key         TEXT PRIMARY KEY   "packaging_history"           │
//! │ value       TEXT NOT NULL      JSON array of batches         │
//! │ updated_at  TEXT NOT NULL      RFC 3339, UTC                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Several slots may share one database file.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use zhataqi_core::{Batch, HistoryStore, StoreError};

use crate::error::{PersistError, PersistResult};
use crate::slot::{decode_batches, encode_batches};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS kv_slots (
        key        TEXT PRIMARY KEY,
        value      TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// History slot backed by SQLite.
pub struct SqliteStore {
    conn: Connection,
    slot: String,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>, slot: &str) -> PersistResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), slot = %slot, "SQLite history store opened");
        Self::with_connection(conn, slot)
    }

    /// A private in-memory database (for testing).
    pub fn in_memory(slot: &str) -> PersistResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, slot)
    }

    fn with_connection(conn: Connection, slot: &str) -> PersistResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn,
            slot: slot.to_string(),
        })
    }

    /// Raw slot content, if the slot was ever written.
    pub fn raw(&self) -> PersistResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1",
                params![self.slot],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    /// Overwrites the slot with arbitrary content.
    pub fn put_raw(&self, value: &str) -> PersistResult<()> {
        self.conn.execute(
            "INSERT INTO kv_slots (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![self.slot, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn read(&self) -> PersistResult<Vec<Batch>> {
        match self.raw()? {
            Some(raw) => decode_batches(&raw),
            None => Ok(Vec::new()),
        }
    }
}

impl HistoryStore for SqliteStore {
    fn load(&self) -> Result<Vec<Batch>, StoreError> {
        self.read().map_err(PersistError::into_load_error)
    }

    fn save(&mut self, batches: &[Batch]) -> Result<(), StoreError> {
        let payload = encode_batches(batches).map_err(PersistError::into_save_error)?;
        self.put_raw(&payload)
            .map_err(PersistError::into_save_error)?;
        debug!(slot = %self.slot, batches = batches.len(), "History saved to SQLite");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zhataqi_core::History;

    #[test]
    fn test_unwritten_slot_is_empty() {
        let store = SqliteStore::in_memory("packaging_history").unwrap();
        assert_eq!(store.raw().unwrap(), None);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_replaces_value() {
        let mut store = SqliteStore::in_memory("packaging_history").unwrap();
        store.put_raw("[1]").unwrap();
        store.save(&[]).unwrap();
        assert_eq!(store.raw().unwrap().as_deref(), Some("[]"));

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM kv_slots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_malformed_value_falls_back_to_empty() {
        let store = SqliteStore::in_memory("packaging_history").unwrap();
        store.put_raw("{broken").unwrap();

        let history = History::open(store);
        assert!(history.batches().is_empty());
        assert!(matches!(history.load_failure(), Some(StoreError::Malformed(_))));
    }

    #[test]
    fn test_slots_are_independent_on_disk() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("zhataqi.db");

        let a = SqliteStore::open(&db, "packaging_history").unwrap();
        a.put_raw("[]").unwrap();
        let b = SqliteStore::open(&db, "other_slot").unwrap();
        assert_eq!(b.raw().unwrap(), None);

        drop(a);
        let reopened = SqliteStore::open(&db, "packaging_history").unwrap();
        assert_eq!(reopened.raw().unwrap().as_deref(), Some("[]"));
    }
}
