//! In-memory backends for testing.
//!
//! All data is stored in memory and lost when the backend is dropped.

use std::collections::BTreeMap;

use bytes::Bytes;
use parking_lot::RwLock;

use super::{BTreeBackend, KvBackend, MemoryBackend};
use crate::{coder::ValueBuffer, error::Result};

/// In-memory [`KvBackend`].
#[derive(Debug, Default)]
pub struct InMemoryKvBackend {
    entries: RwLock<BTreeMap<Vec<u8>, Bytes>>,
}

impl InMemoryKvBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvBackend for InMemoryKvBackend {
    fn write(&self, key: &[u8], value: Bytes) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn read(&self, key: &[u8]) -> Result<Option<Bytes>> {
        // Bytes clones share the stored buffer
        Ok(self.entries.read().get(key).cloned())
    }
}

/// In-memory [`BTreeBackend`] keeping values in key order.
#[derive(Debug, Default)]
pub struct InMemoryBTreeBackend {
    entries: RwLock<BTreeMap<Vec<u8>, ValueBuffer>>,
}

impl InMemoryBTreeBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.entries.read().keys().cloned().collect()
    }

    /// Overwrites the raw stored value under `key`, bypassing any coder.
    pub fn store_raw(&self, key: &[u8], bytes: Vec<u8>) {
        self.entries.write().insert(key.to_vec(), ValueBuffer::from_vec(bytes));
    }
}

impl BTreeBackend for InMemoryBTreeBackend {
    fn store(&self, key: &[u8], value: &ValueBuffer) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value.clone());
        Ok(())
    }

    fn fetch(&self, key: &[u8]) -> Result<Option<ValueBuffer>> {
        Ok(self.entries.read().get(key).cloned())
    }
}

/// In-memory [`MemoryBackend`].
#[derive(Debug, Default)]
pub struct InMemoryRowStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryRowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl MemoryBackend for InMemoryRowStore {
    fn put(&self, key: &[u8], value: Vec<u8>) {
        self.entries.write().insert(key.to_vec(), value);
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }
}
