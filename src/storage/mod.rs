//! Key-value persistence media.
//!
//! The document store keeps each collection as one serialized value under a
//! fixed key. A backend only has to read keys and apply a [`WriteBatch`]
//! all-or-nothing.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::error::Result;
use crate::wal::KeyWrite;

/// Persistence medium for the document store.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Apply every write in the batch, or none of them.
    fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// All keys currently stored.
    fn keys(&self) -> Result<Vec<String>>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        (**self).commit(batch)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}

/// Ordered set of key replacements committed together.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    writes: Vec<KeyWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value under `key`. A later write to the same key wins.
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.push(key.into(), Some(value));
    }

    pub fn remove(&mut self, key: impl Into<String>) {
        self.push(key.into(), None);
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().map(|w| w.key.as_str())
    }

    pub fn into_writes(self) -> Vec<KeyWrite> {
        self.writes
    }

    fn push(&mut self, key: String, value: Option<Vec<u8>>) {
        if let Some(existing) = self.writes.iter_mut().find(|w| w.key == key) {
            existing.value = value;
        } else {
            self.writes.push(KeyWrite { key, value });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_last_write_wins() {
        let mut batch = WriteBatch::new();
        batch.put("visits", b"[1]".to_vec());
        batch.put("actions", b"[]".to_vec());
        batch.put("visits", b"[2]".to_vec());

        assert_eq!(batch.len(), 2);
        let writes = batch.into_writes();
        assert_eq!(writes[0].key, "visits");
        assert_eq!(writes[0].value.as_deref(), Some(&b"[2]"[..]));
    }

    #[test]
    fn test_batch_remove() {
        let mut batch = WriteBatch::new();
        batch.put("visits", b"[1]".to_vec());
        batch.remove("visits");

        let writes = batch.into_writes();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].value.is_none());
    }
}
