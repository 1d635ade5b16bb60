//! In-memory key-value adapter.

use std::collections::HashMap;

use super::{DbResult, KeyValueStore};

/// `HashMap`-backed store. Contents vanish with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether `key` holds a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> DbResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &[u8]) -> DbResult<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> DbResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_delete() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        store.write("patients", b"[]").unwrap();
        assert_eq!(store.read("patients").unwrap(), Some(b"[]".to_vec()));
        assert_eq!(store.len(), 1);

        store.delete("patients").unwrap();
        assert!(!store.contains_key("patients"));

        // Deleting again is fine
        store.delete("patients").unwrap();
    }
}
