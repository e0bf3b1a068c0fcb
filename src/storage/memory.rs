//! In-memory backend for tests and ephemeral journals.

use super::{StorageBackend, WriteBatch};
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Keeps every key in a map. Nothing survives a drop.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key directly, bypassing the document store.
    pub fn with_entry(self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.entries.write().insert(key.into(), value);
        self
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut entries = self.entries.write();
        for write in batch.into_writes() {
            match write.value {
                Some(value) => {
                    entries.insert(write.key, value);
                }
                None => {
                    entries.remove(&write.key);
                }
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
