//! Key-value storage description.

use std::sync::Arc;

use bytes::Bytes;
use tessera_proto::WireSchema;
use tessera_types::{ProtobufFormatType, Row, RowFormatConfig};

use super::RowStorageDescription;
use crate::{
    backend::KvBackend,
    error::Result,
    format::ProtobufStorageFormat,
    owner::StorageOwner,
};

/// Stores rows as message bytes in a [`KvBackend`].
#[derive(Debug)]
pub struct KvStorageDescription {
    format: ProtobufStorageFormat,
}

impl KvStorageDescription {
    /// Creates a description for `owner`.
    pub fn new(
        owner: impl Into<StorageOwner>,
        format_type: ProtobufFormatType,
        schema: Arc<WireSchema>,
        config: RowFormatConfig,
    ) -> Self {
        Self { format: ProtobufStorageFormat::new(owner, format_type, schema, config) }
    }

    /// Packs `row` and writes it under `key`.
    ///
    /// # Errors
    ///
    /// Returns any packing or backend error.
    pub fn write_row(&self, backend: &dyn KvBackend, key: &[u8], row: &Row) -> Result<()> {
        backend.write(key, self.pack_row(row)?)
    }

    /// Reads and expands the row under `key`.
    ///
    /// # Errors
    ///
    /// Returns any backend or expansion error.
    pub fn read_row(&self, backend: &dyn KvBackend, key: &[u8]) -> Result<Option<Row>> {
        backend.read(key)?.map(|value| self.expand_row(&value)).transpose()
    }
}

impl RowStorageDescription for KvStorageDescription {
    type Native = Bytes;

    const BACKEND: &'static str = "key-value";

    fn format(&self) -> &ProtobufStorageFormat {
        &self.format
    }

    fn pack_row(&self, row: &Row) -> Result<Bytes> {
        self.format.pack(row).map(Bytes::from)
    }

    fn expand_row(&self, native: &Bytes) -> Result<Row> {
        self.format.expand(native)
    }

    fn clone_for_owner(&self, owner: StorageOwner) -> Self {
        Self { format: self.format.clone_for(owner) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tessera_test_utils::{fixtures, test_row_format_config, wire};
    use tessera_types::{FlatRow, Value};

    use super::*;
    use crate::{StoreError, backend::InMemoryKvBackend};

    fn description() -> KvStorageDescription {
        let group = fixtures::orders_items_group();
        let schema = Arc::new(wire::group_schema(&group));
        KvStorageDescription::new(group, ProtobufFormatType::Group, schema, test_row_format_config())
    }

    #[test]
    fn test_rows_roundtrip_through_backend() {
        let description = description();
        let backend = InMemoryKvBackend::new();
        let order = Row::new(fixtures::ORDERS_ID, [Value::Int(5), Value::Null]);
        let item = Row::new(fixtures::ITEMS_ID, [Value::Int(5), Value::Int(77), Value::Int(2)]);

        description.write_row(&backend, b"o5", &order).unwrap();
        description.write_row(&backend, b"o5i77", &item).unwrap();
        assert_eq!(description.read_row(&backend, b"o5").unwrap(), Some(order));
        assert_eq!(description.read_row(&backend, b"o5i77").unwrap(), Some(item));
        assert_eq!(description.read_row(&backend, b"missing").unwrap(), None);
    }

    #[test]
    fn test_legacy_rows_are_supported() {
        let description = description();
        let (orders, _) = fixtures::orders_items();
        let row = Row::new(fixtures::ORDERS_ID, [Value::Int(3), Value::Null]);
        let flat = FlatRow::from_row(&orders, &row).unwrap();

        let native = description.pack_legacy_row(&flat).unwrap();
        assert_eq!(description.expand_row(&native).unwrap(), row);
        assert_eq!(description.expand_legacy_row(&native).unwrap(), flat);
    }

    #[test]
    fn test_garbage_is_an_error_not_a_default_row() {
        let description = description();
        let err = description.expand_row(&Bytes::from_static(&[0x0A, 0xFF])).unwrap_err();
        assert!(matches!(err, StoreError::Conversion { .. }));
    }

    #[test]
    fn test_clone_for_owner_starts_cold() {
        let description = description();
        description.pack_row(&Row::new(fixtures::ORDERS_ID, [Value::Int(1), Value::Null])).unwrap();
        assert!(description.format().is_cached());
        let copy = description.clone_for_owner(StorageOwner::Group(fixtures::orders_items_group()));
        assert!(!copy.format().is_cached());
        assert_eq!(KvStorageDescription::BACKEND, "key-value");
    }
}
