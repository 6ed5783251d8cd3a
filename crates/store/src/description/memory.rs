//! In-memory storage description.

use std::sync::Arc;

use tessera_proto::WireSchema;
use tessera_types::{FlatRow, ProtobufFormatType, Row, RowFormatConfig};

use super::RowStorageDescription;
use crate::{
    backend::MemoryBackend,
    error::{Result, StoreError},
    format::ProtobufStorageFormat,
    owner::StorageOwner,
};

/// Stores rows as owned message bytes in a [`MemoryBackend`].
///
/// The in-memory backend only understands structured rows: the legacy flat
/// row entry points always fail with [`StoreError::Unsupported`].
#[derive(Debug)]
pub struct MemoryStorageDescription {
    format: ProtobufStorageFormat,
}

impl MemoryStorageDescription {
    /// Creates a description for `owner`.
    pub fn new(
        owner: impl Into<StorageOwner>,
        format_type: ProtobufFormatType,
        schema: Arc<WireSchema>,
        config: RowFormatConfig,
    ) -> Self {
        Self { format: ProtobufStorageFormat::new(owner, format_type, schema, config) }
    }

    /// Packs `row` and puts it under `key`.
    ///
    /// # Errors
    ///
    /// Returns any packing error.
    pub fn write_row(&self, backend: &dyn MemoryBackend, key: &[u8], row: &Row) -> Result<()> {
        backend.put(key, self.pack_row(row)?);
        Ok(())
    }

    /// Expands the row under `key`.
    ///
    /// # Errors
    ///
    /// Returns any expansion error.
    pub fn read_row(&self, backend: &dyn MemoryBackend, key: &[u8]) -> Result<Option<Row>> {
        backend.get(key).map(|value| self.expand_row(&value)).transpose()
    }
}

impl RowStorageDescription for MemoryStorageDescription {
    type Native = Vec<u8>;

    const BACKEND: &'static str = "memory";

    fn format(&self) -> &ProtobufStorageFormat {
        &self.format
    }

    fn pack_row(&self, row: &Row) -> Result<Vec<u8>> {
        self.format.pack(row)
    }

    fn expand_row(&self, native: &Vec<u8>) -> Result<Row> {
        self.format.expand(native)
    }

    fn pack_legacy_row(&self, _flat: &FlatRow) -> Result<Vec<u8>> {
        Err(StoreError::Unsupported { backend: Self::BACKEND, operation: "packing legacy rows" })
    }

    fn expand_legacy_row(&self, _native: &Vec<u8>) -> Result<FlatRow> {
        Err(StoreError::Unsupported { backend: Self::BACKEND, operation: "expanding legacy rows" })
    }

    fn clone_for_owner(&self, owner: StorageOwner) -> Self {
        Self { format: self.format.clone_for(owner) }
    }
}
