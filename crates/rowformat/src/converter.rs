//! Entry point selecting a table or group converter for a wire schema.

use std::sync::Arc;

use snafu::ResultExt;
use tessera_proto::{DynamicMessage, MessageDescriptor, WireSchema};
use tessera_types::{Row, RowFormatConfig, Table, TableGroup, TableId};
use tracing::debug;

use crate::{
    error::{ConversionError, UnknownTableSnafu, WireSnafu},
    group::GroupConverter,
    table::TableConverter,
};

/// Converter bound to either one table or a whole group.
#[derive(Debug, Clone)]
pub enum RowConverter {
    /// Rows of a single table, stored as that table's message.
    Table(TableConverter),
    /// Rows of any member table, stored wrapped in the group message.
    Group(GroupConverter),
}

impl RowConverter {
    /// Binds `table` to its message in `schema`.
    ///
    /// The message annotated with the table's identity is preferred. A
    /// schema holding exactly one table message uses that message.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::SchemaMismatch`] if no message fits, or any
    /// error from [`TableConverter::new`].
    pub fn for_table(
        table: Arc<Table>,
        schema: &WireSchema,
        config: &RowFormatConfig,
    ) -> Result<Self, ConversionError> {
        let message = match schema.table_message(table.uuid) {
            Some(message) => message.clone(),
            None => sole_table_message(schema)?,
        };
        debug!(table = %table.qualified_name(), message = message.full_name(), "Building table converter");
        TableConverter::new(table, message, config).map(Self::Table)
    }

    /// Binds `group` to the group message in `schema`.
    ///
    /// Messages are scanned in reverse declaration order for the one
    /// flagged as the group message. A single-table group may omit it, in
    /// which case its table's own message is bound.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::SchemaMismatch`] if more than one message is
    /// flagged, or if none is and the group has several members, or any
    /// error from the underlying converter.
    pub fn for_group(
        group: Arc<TableGroup>,
        schema: &WireSchema,
        config: &RowFormatConfig,
    ) -> Result<Self, ConversionError> {
        let mut flagged = schema.messages().iter().rev().filter(|m| m.is_group());
        match (flagged.next(), flagged.next()) {
            (Some(message), None) => {
                debug!(group = group.name(), message = message.full_name(), "Building group converter");
                GroupConverter::new(group, message.clone(), config).map(Self::Group)
            },
            (Some(first), Some(second)) => Err(ConversionError::SchemaMismatch {
                message_type: first.full_name().to_string(),
                reason: format!("{} is also flagged as the group message", second.full_name()),
            }),
            (None, _) => {
                let members = group.members();
                match members.as_slice() {
                    [table] => Self::for_table(Arc::clone(table), schema, config),
                    _ => Err(ConversionError::SchemaMismatch {
                        message_type: schema.package().to_string(),
                        reason: format!("no group message for group {} of {} tables", group.name(), members.len()),
                    }),
                }
            },
        }
    }

    /// Id of the bound table, or of the group's root table.
    pub fn table_id(&self) -> TableId {
        match self {
            Self::Table(converter) => converter.table_id(),
            Self::Group(converter) => converter.group().root_id(),
        }
    }

    /// Message type that [`encode`](Self::encode) produces.
    pub fn message(&self) -> &MessageDescriptor {
        match self {
            Self::Table(converter) => converter.message(),
            Self::Group(converter) => converter.message(),
        }
    }

    /// Whether rows of `table_id` can be converted.
    pub fn contains_table(&self, table_id: TableId) -> bool {
        match self {
            Self::Table(converter) => converter.table_id() == table_id,
            Self::Group(converter) => converter.contains(table_id),
        }
    }

    /// Converter for the rows of one table.
    pub fn table_converter(&self, table_id: TableId) -> Option<&TableConverter> {
        match self {
            Self::Table(converter) => (converter.table_id() == table_id).then_some(converter),
            Self::Group(converter) => converter.table_converter(table_id),
        }
    }

    /// Encodes a row as the bound message.
    ///
    /// # Errors
    ///
    /// Returns any error from the table or group converter.
    pub fn encode(&self, row: &Row) -> Result<DynamicMessage, ConversionError> {
        match self {
            Self::Table(converter) => converter.encode(row),
            Self::Group(converter) => converter.encode(row),
        }
    }

    /// Decodes a message of the bound type.
    ///
    /// # Errors
    ///
    /// Returns any error from the table or group converter.
    pub fn decode(&self, message: &DynamicMessage) -> Result<Row, ConversionError> {
        match self {
            Self::Table(converter) => converter.decode(message),
            Self::Group(converter) => converter.decode(message),
        }
    }

    /// Encodes a row straight to bytes.
    ///
    /// # Errors
    ///
    /// Returns any error from [`encode`](Self::encode).
    pub fn encode_to_vec(&self, row: &Row) -> Result<Vec<u8>, ConversionError> {
        self.encode(row).map(|message| message.encode_to_vec())
    }

    /// Parses `bytes` as the bound message and decodes the row.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Wire`] naming the expected message type if
    /// the bytes do not parse, or any error from [`decode`](Self::decode).
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Row, ConversionError> {
        let message = DynamicMessage::decode(self.message(), bytes).context(WireSnafu)?;
        self.decode(&message)
    }

    /// Encodes a row as its table's own message, never wrapped.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::UnknownTable`] if the row's table is not
    /// bound, or any encoding error.
    pub fn encode_table(&self, row: &Row) -> Result<DynamicMessage, ConversionError> {
        self.table_converter(row.table_id)
            .ok_or_else(|| self.unknown(row.table_id))?
            .encode(row)
    }

    /// Decodes a table's own message.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::UnknownTable`] if `table_id` is not bound,
    /// or any decoding error.
    pub fn decode_table(&self, table_id: TableId, message: &DynamicMessage) -> Result<Row, ConversionError> {
        self.table_converter(table_id).ok_or_else(|| self.unknown(table_id))?.decode(message)
    }

    fn unknown(&self, table_id: TableId) -> ConversionError {
        let group = match self {
            Self::Table(converter) => converter.table().qualified_name(),
            Self::Group(converter) => converter.group().name().to_string(),
        };
        UnknownTableSnafu { group, table_id }.build()
    }
}

fn sole_table_message(schema: &WireSchema) -> Result<MessageDescriptor, ConversionError> {
    let mut tables = schema.messages().iter().filter(|m| !m.is_group());
    match (tables.next(), tables.next()) {
        (Some(message), None) => Ok(message.clone()),
        _ => Err(ConversionError::SchemaMismatch {
            message_type: schema.package().to_string(),
            reason: "no message carries the table's identity".to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tessera_proto::{FieldKind, WireValue};
    use tessera_test_utils::{fixtures, wire};
    use tessera_types::Value;

    use super::*;

    #[test]
    fn test_orders_row_with_null_total_through_group() {
        let group = fixtures::orders_items_group();
        let schema = wire::group_schema(&group);
        let converter = RowConverter::for_group(Arc::clone(&group), &schema, &RowFormatConfig::default()).unwrap();
        let orders = group.root().unwrap();
        let row = Row::new(orders.id, [Value::Int(5), Value::Null]);

        let message = converter.encode(&row).unwrap();
        let (_, wrapped) = message.fields().next().unwrap();
        assert_eq!(message.populated(), 1);
        let WireValue::Message(inner) = wrapped else { panic!("expected a submessage") };
        let by_name = |name: &str| inner.descriptor().fields().iter().find(|f| f.name() == name).unwrap().number();
        assert_eq!(inner.get(by_name("id")), Some(&WireValue::I64(5)));
        assert!(!inner.has(by_name("total")));
        assert_eq!(inner.get(by_name("total_is_null")), Some(&WireValue::Bool(true)));

        let bytes = message.encode_to_vec();
        assert_eq!(converter.decode_bytes(&bytes).unwrap(), row);
    }

    #[test]
    fn test_single_member_group_falls_back_to_table() {
        let (orders, _) = fixtures::orders_items();
        let group = Arc::new(TableGroup::single(Arc::clone(&orders)));
        let schema = wire::table_schema(&orders);
        let converter = RowConverter::for_group(group, &schema, &RowFormatConfig::default()).unwrap();
        assert!(matches!(converter, RowConverter::Table(_)));
        assert_eq!(converter.table_id(), orders.id);
    }

    #[test]
    fn test_two_flagged_messages_are_rejected() {
        let group = fixtures::orders_items_group();
        let mut proto = wire::group_schema(&group).proto().clone();
        let mut extra = proto.messages.iter().find(|m| m.name == wire::GROUP_MESSAGE).unwrap().clone();
        extra.name = "_Group2".to_string();
        proto.messages.push(extra);
        let schema = WireSchema::compile(proto).unwrap();
        let err = RowConverter::for_group(group, &schema, &RowFormatConfig::default()).unwrap_err();
        assert!(err.to_string().contains("also flagged"), "{err}");
    }

    #[test]
    fn test_multi_member_group_needs_group_message() {
        let group = fixtures::orders_items_group();
        let mut proto = wire::group_schema(&group).proto().clone();
        proto.messages.retain(|m| m.name != wire::GROUP_MESSAGE);
        let schema = WireSchema::compile(proto).unwrap();
        assert!(RowConverter::for_group(group, &schema, &RowFormatConfig::default()).is_err());
    }

    #[test]
    fn test_table_level_calls_on_group() {
        let group = fixtures::orders_items_group();
        let schema = wire::group_schema(&group);
        let converter = RowConverter::for_group(Arc::clone(&group), &schema, &RowFormatConfig::default()).unwrap();
        let items = group.members()[1].clone();
        let row = Row::new(items.id, [Value::Int(1), Value::Int(2), Value::Int(3)]);

        assert!(converter.contains_table(items.id));
        assert_eq!(converter.table_id(), group.root_id());
        let message = converter.encode_table(&row).unwrap();
        assert_eq!(message.descriptor().table_uuid(), Some(items.uuid));
        assert_eq!(converter.decode_table(items.id, &message).unwrap(), row);
        assert!(matches!(
            converter.decode_table(TableId::new(77), &message),
            Err(ConversionError::UnknownTable { .. })
        ));
    }

    #[test]
    fn test_garbage_bytes_name_expected_message() {
        let (orders, _) = fixtures::orders_items();
        let schema = wire::table_schema(&orders);
        let converter = RowConverter::for_table(orders, &schema, &RowFormatConfig::default()).unwrap();
        let err = converter.decode_bytes(&[0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(err.to_string().contains(converter.message().full_name()), "{err}");
        assert_eq!(converter.message().fields()[0].kind(), FieldKind::Sint64);
    }
}
