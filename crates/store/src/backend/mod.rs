//! Storage backend interfaces consumed by the storage descriptions.
//!
//! Each backend exchanges rows in its own native value type:
//! - [`KvBackend`]: `bytes::Bytes` under arbitrary byte keys
//! - [`BTreeBackend`]: framed [`ValueBuffer`]s
//! - [`MemoryBackend`]: owned `Vec<u8>` values
//!
//! The in-memory implementations in this module back tests and tooling.

mod memory;

pub use memory::{InMemoryBTreeBackend, InMemoryKvBackend, InMemoryRowStore};

use bytes::Bytes;

use crate::{coder::ValueBuffer, error::Result};

/// Key-value backend storing raw message bytes.
pub trait KvBackend: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn write(&self, key: &[u8], value: Bytes) -> Result<()>;

    /// Reads the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read.
    fn read(&self, key: &[u8]) -> Result<Option<Bytes>>;
}

/// Ordered backend storing framed values.
pub trait BTreeBackend: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn store(&self, key: &[u8], value: &ValueBuffer) -> Result<()>;

    /// Fetches the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read.
    fn fetch(&self, key: &[u8]) -> Result<Option<ValueBuffer>>;
}

/// Volatile backend storing owned message bytes.
pub trait MemoryBackend: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: Vec<u8>);

    /// Returns a copy of the value under `key`.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
}
