//! SQLite-backed key-value adapter.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::{DbResult, KeyValueStore, SCHEMA};

const UPSERT_SQL: &str =
    "INSERT OR REPLACE INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, datetime('now'))";

/// Key-value store persisted in a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// List stored keys in lexical order.
    pub fn keys(&self) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_entries ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl KeyValueStore for SqliteStore {
    fn read(&self, key: &str) -> DbResult<Option<Vec<u8>>> {
        self.conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn write(&mut self, key: &str, value: &[u8]) -> DbResult<()> {
        self.conn.execute(UPSERT_SQL, params![key, value])?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> DbResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", [key])?;
        Ok(())
    }

    /// All entries are written inside one transaction.
    fn write_batch(&mut self, entries: &[(String, Vec<u8>)]) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        for (key, value) in entries {
            tx.execute(UPSERT_SQL, params![key, value])?;
        }
        tx.commit()?;
        Ok(())
    }
}
