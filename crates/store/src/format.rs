//! Protobuf storage format shared by every storage description.
//!
//! # Converter cache
//!
//! The [`RowConverter`] for an owner is built on first use and cached for
//! the lifetime of the format:
//! - Readers take the read lock and clone the cached `Arc`
//! - On a miss the write lock is taken and the cache re-checked before
//!   building, so concurrent first callers build exactly one converter
//! - A format copied for a new owner starts with an empty cache

use std::sync::Arc;

use parking_lot::RwLock;
use snafu::{OptionExt, ResultExt};
use tessera_proto::WireSchema;
use tessera_rowformat::RowConverter;
use tessera_types::{FlatRow, ProtobufFormatType, Row, RowFormatConfig, TableGroup};
use tracing::debug;

use crate::{
    error::{ConversionSnafu, FlatRowSnafu, Result, UnknownTableSnafu},
    owner::StorageOwner,
};

/// Format metadata and the lazily built converter of one table or group.
#[derive(Debug)]
pub struct ProtobufStorageFormat {
    owner: StorageOwner,
    format_type: ProtobufFormatType,
    schema: Arc<WireSchema>,
    config: RowFormatConfig,
    converter: RwLock<Option<Arc<RowConverter>>>,
}

impl ProtobufStorageFormat {
    /// Creates a format for `owner`. No converter is built until first use.
    pub fn new(
        owner: impl Into<StorageOwner>,
        format_type: ProtobufFormatType,
        schema: Arc<WireSchema>,
        config: RowFormatConfig,
    ) -> Self {
        Self { owner: owner.into(), format_type, schema, config, converter: RwLock::new(None) }
    }

    /// Copy of this format for a new owner, as made when a schema change
    /// replaces the owning table or group.
    ///
    /// Format metadata is copied. The cached converter is not: the copy
    /// builds its own against the new owner on first use.
    #[must_use]
    pub fn clone_for(&self, owner: impl Into<StorageOwner>) -> Self {
        Self::new(owner, self.format_type, Arc::clone(&self.schema), self.config.clone())
    }

    /// The owning table or group.
    pub fn owner(&self) -> &StorageOwner {
        &self.owner
    }

    /// Whether rows are stored as table messages or group messages.
    pub fn format_type(&self) -> ProtobufFormatType {
        self.format_type
    }

    /// The compiled wire schema.
    pub fn schema(&self) -> &Arc<WireSchema> {
        &self.schema
    }

    /// Row format settings.
    pub fn config(&self) -> &RowFormatConfig {
        &self.config
    }

    /// Whether the converter has been built.
    pub fn is_cached(&self) -> bool {
        self.converter.read().is_some()
    }

    /// Returns the converter, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conversion`](crate::StoreError::Conversion) if the
    /// wire schema does not fit the owner. A failed build is not cached.
    pub fn converter(&self) -> Result<Arc<RowConverter>> {
        if let Some(converter) = self.converter.read().as_ref() {
            return Ok(Arc::clone(converter));
        }

        let mut guard = self.converter.write();
        if let Some(converter) = guard.as_ref() {
            return Ok(Arc::clone(converter));
        }
        debug!(owner = %self.owner.name(), format = ?self.format_type, "Converter cache miss, building");
        let converter = Arc::new(self.build().context(ConversionSnafu)?);
        *guard = Some(Arc::clone(&converter));
        Ok(converter)
    }

    fn build(&self) -> std::result::Result<RowConverter, tessera_rowformat::ConversionError> {
        match (&self.owner, self.format_type) {
            (StorageOwner::Table(table), ProtobufFormatType::SingleTable) => {
                RowConverter::for_table(Arc::clone(table), &self.schema, &self.config)
            },
            (StorageOwner::Table(table), ProtobufFormatType::Group) => {
                let group = Arc::new(TableGroup::single(Arc::clone(table)));
                RowConverter::for_group(group, &self.schema, &self.config)
            },
            (StorageOwner::Group(group), ProtobufFormatType::Group) => {
                RowConverter::for_group(Arc::clone(group), &self.schema, &self.config)
            },
            (StorageOwner::Group(group), ProtobufFormatType::SingleTable) => match group.root() {
                Some(root) => RowConverter::for_table(Arc::clone(root), &self.schema, &self.config),
                None => Err(tessera_rowformat::ConversionError::SchemaMismatch {
                    message_type: self.schema.package().to_string(),
                    reason: format!("group {} has no root table", group.name()),
                }),
            },
        }
    }

    /// Encodes `row` to message bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conversion`](crate::StoreError::Conversion) if the
    /// converter cannot be built or the row cannot be encoded.
    pub fn pack(&self, row: &Row) -> Result<Vec<u8>> {
        self.converter()?.encode_to_vec(row).context(ConversionSnafu)
    }

    /// Decodes message bytes to a row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conversion`](crate::StoreError::Conversion) if the
    /// bytes do not parse as the expected message or do not decode.
    pub fn expand(&self, bytes: &[u8]) -> Result<Row> {
        self.converter()?.decode_bytes(bytes).context(ConversionSnafu)
    }

    /// Converts a flat row of any table the owner stores to a [`Row`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTable`](crate::StoreError::UnknownTable)
    /// if the owner does not store the row's table, or
    /// [`StoreError::FlatRow`](crate::StoreError::FlatRow) if it is malformed.
    pub fn flat_to_row(&self, flat: &FlatRow) -> Result<Row> {
        let table_id = flat.table_id();
        let table = self.owner.table(table_id).context(UnknownTableSnafu { owner: self.owner.name(), table_id })?;
        flat.to_row(table).context(FlatRowSnafu)
    }

    /// Flattens a row of any table the owner stores.
    ///
    /// # Errors
    ///
    /// See [`flat_to_row`](Self::flat_to_row).
    pub fn row_to_flat(&self, row: &Row) -> Result<FlatRow> {
        let table = self
            .owner
            .table(row.table_id)
            .context(UnknownTableSnafu { owner: self.owner.name(), table_id: row.table_id })?;
        FlatRow::from_row(table, row).context(FlatRowSnafu)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Barrier;

    use tessera_test_utils::{fixtures, wire};
    use tessera_types::Value;

    use super::*;
    use crate::StoreError;

    fn group_format() -> ProtobufStorageFormat {
        let group = fixtures::orders_items_group();
        let schema = Arc::new(wire::group_schema(&group));
        ProtobufStorageFormat::new(group, ProtobufFormatType::Group, schema, RowFormatConfig::default())
    }

    #[test]
    fn test_converter_built_lazily_and_cached() {
        let format = group_format();
        assert!(!format.is_cached());
        let first = format.converter().unwrap();
        assert!(format.is_cached());
        assert!(Arc::ptr_eq(&first, &format.converter().unwrap()));
    }

    #[test]
    fn test_concurrent_first_use_builds_one_converter() {
        const THREADS: usize = 16;
        let format = group_format();
        let barrier = Barrier::new(THREADS);
        let row = Row::new(fixtures::ORDERS_ID, [Value::Int(5), Value::Null]);

        let converters: Vec<Arc<RowConverter>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        let packed = format.pack(&row).unwrap();
                        assert_eq!(format.expand(&packed).unwrap(), row);
                        format.converter().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let first = &converters[0];
        assert!(converters.iter().all(|c| Arc::ptr_eq(c, first)));
    }

    #[test]
    fn test_clone_for_new_owner_does_not_inherit_converter() {
        let format = group_format();
        let before = format.converter().unwrap();

        let mut altered = (*fixtures::orders_items_group()).clone();
        let orders = altered.root().unwrap().clone();
        let renamed = orders.with_columns(orders.columns.clone()).unwrap();
        altered.replace_table(Arc::new(renamed)).unwrap();
        let copy = format.clone_for(Arc::new(altered));

        assert!(!copy.is_cached());
        assert_eq!(copy.format_type(), format.format_type());
        assert!(Arc::ptr_eq(copy.schema(), format.schema()));
        let after = copy.converter().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let (orders, _) = fixtures::orders_items();
        let group = fixtures::orders_items_group();
        let schema = Arc::new(wire::table_schema(&orders));
        let format = ProtobufStorageFormat::new(group, ProtobufFormatType::Group, schema, RowFormatConfig::default());
        assert!(matches!(format.converter(), Err(StoreError::Conversion { .. })));
        assert!(!format.is_cached());
    }

    #[test]
    fn test_single_table_format_on_table_owner() {
        let (orders, _) = fixtures::orders_items();
        let schema = Arc::new(wire::table_schema(&orders));
        let format =
            ProtobufStorageFormat::new(orders, ProtobufFormatType::SingleTable, schema, RowFormatConfig::default());
        let row = Row::new(fixtures::ORDERS_ID, [Value::Int(1), Value::Null]);
        assert_eq!(format.expand(&format.pack(&row).unwrap()).unwrap(), row);
    }

    #[test]
    fn test_flat_rows_resolve_member_tables() {
        let format = group_format();
        let row = Row::new(fixtures::ITEMS_ID, [Value::Int(1), Value::Int(2), Value::Null]);
        let flat = format.row_to_flat(&row).unwrap();
        assert_eq!(format.flat_to_row(&flat).unwrap(), row);

        let stranger = Row::new(tessera_types::TableId::new(50), [Value::Int(1)]);
        assert!(matches!(format.row_to_flat(&stranger), Err(StoreError::UnknownTable { .. })));
    }
}
