//! Persistence layer: a synchronous key-value byte store.
//!
//! The domain store only ever sees the [`KeyValueStore`] trait. Two adapters
//! ship with the crate: [`MemoryStore`] for tests and ephemeral sessions, and
//! [`SqliteStore`] for on-device persistence.

mod memory;
mod schema;
mod sqlite;

pub use memory::*;
pub use schema::*;
pub use sqlite::*;

use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Byte-string key-value adapter.
///
/// No transactions across keys are required of an implementation. Callers that
/// need several keys to change together go through [`KeyValueStore::write_batch`],
/// which adapters with real transactions should override.
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> DbResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, value: &[u8]) -> DbResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &str) -> DbResult<()>;

    /// Write several entries so that either all of them land or none do.
    ///
    /// The default implementation writes sequentially and, when a write fails,
    /// restores the keys it already overwrote before returning the error.
    fn write_batch(&mut self, entries: &[(String, Vec<u8>)]) -> DbResult<()> {
        let mut previous: Vec<(String, Option<Vec<u8>>)> = Vec::with_capacity(entries.len());

        for (key, value) in entries {
            let before = match self.read(key) {
                Ok(before) => before,
                Err(err) => {
                    restore_entries(self, previous);
                    return Err(err);
                }
            };

            if let Err(err) = self.write(key, value) {
                restore_entries(self, previous);
                return Err(err);
            }
            previous.push((key.clone(), before));
        }

        Ok(())
    }
}

fn restore_entries<S: KeyValueStore + ?Sized>(
    store: &mut S,
    previous: Vec<(String, Option<Vec<u8>>)>,
) {
    for (key, before) in previous.into_iter().rev() {
        let result = match before {
            Some(bytes) => store.write(&key, &bytes),
            None => store.delete(&key),
        };
        if let Err(err) = result {
            tracing::warn!(key = %key, error = %err, "failed to restore key after batch write failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Memory store that rejects writes to one key.
    struct RejectingStore {
        inner: MemoryStore,
        reject: &'static str,
    }

    impl KeyValueStore for RejectingStore {
        fn read(&self, key: &str) -> DbResult<Option<Vec<u8>>> {
            self.inner.read(key)
        }

        fn write(&mut self, key: &str, value: &[u8]) -> DbResult<()> {
            if key == self.reject {
                return Err(DbError::Backend(format!("write to {key} rejected")));
            }
            self.inner.write(key, value)
        }

        fn delete(&mut self, key: &str) -> DbResult<()> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn test_default_batch_restores_written_keys() {
        let mut store = RejectingStore {
            inner: MemoryStore::new(),
            reject: "second",
        };
        store.inner.write("first", b"old").unwrap();

        let result = store.write_batch(&[
            ("first".to_string(), b"new".to_vec()),
            ("fresh".to_string(), b"value".to_vec()),
            ("second".to_string(), b"never".to_vec()),
        ]);

        assert!(matches!(result, Err(DbError::Backend(_))));
        assert_eq!(store.read("first").unwrap(), Some(b"old".to_vec()));
        assert_eq!(store.read("fresh").unwrap(), None);
        assert_eq!(store.read("second").unwrap(), None);
    }

    #[test]
    fn test_default_batch_writes_everything() {
        let mut store = MemoryStore::new();
        store
            .write_batch(&[
                ("a".to_string(), b"1".to_vec()),
                ("b".to_string(), b"2".to_vec()),
            ])
            .unwrap();

        assert_eq!(store.read("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.read("b").unwrap(), Some(b"2".to_vec()));
    }
}
