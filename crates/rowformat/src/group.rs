//! Converter for the rows of every table in a group.
//!
//! A group message has one field per member table, each holding that
//! table's message. Exactly one field is populated per stored row, which
//! makes the group message a tagged union over its members.

use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use snafu::{OptionExt, ResultExt};
use tessera_proto::{DynamicMessage, FieldKind, MessageDescriptor, WireValue};
use tessera_types::{Row, RowFormatConfig, TableGroup, TableId};
use tracing::{debug, error};

use crate::{
    error::{ConversionError, UnknownTableSnafu, WireSnafu},
    table::TableConverter,
};

#[derive(Debug, Clone)]
struct Member {
    field: u32,
    converter: TableConverter,
}

/// Converts rows of any member table to and from the group message.
#[derive(Debug, Clone)]
pub struct GroupConverter {
    group: Arc<TableGroup>,
    message: MessageDescriptor,
    members: BTreeMap<TableId, Member>,
    by_field: HashMap<u32, TableId>,
}

impl GroupConverter {
    /// Binds the members of `group` to the fields of the group `message`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::SchemaMismatch`] if a field names no member
    /// table, is not a message field, or repeats a member, if a member has no
    /// field, or if any member's [`TableConverter`] fails to bind.
    pub fn new(
        group: Arc<TableGroup>,
        message: MessageDescriptor,
        config: &RowFormatConfig,
    ) -> Result<Self, ConversionError> {
        let mismatch = |reason: String| ConversionError::SchemaMismatch {
            message_type: message.full_name().to_string(),
            reason,
        };

        let mut members = BTreeMap::new();
        let mut by_field = HashMap::new();
        for field in message.fields() {
            let table = field
                .uuid()
                .or_else(|| field.message_type().and_then(MessageDescriptor::table_uuid))
                .and_then(|uuid| group.table_by_uuid(uuid))
                .ok_or_else(|| mismatch(format!("field {} names no member table", field.name())))?;
            if field.kind() != FieldKind::Message {
                return Err(mismatch(format!("field {} is {}, not a message", field.name(), field.kind())));
            }
            if members.contains_key(&table.id) {
                return Err(mismatch(format!("table {} has more than one field", table.qualified_name())));
            }
            let submessage = field
                .message_type()
                .cloned()
                .ok_or_else(|| mismatch(format!("field {} has no message type", field.name())))?;
            let converter = TableConverter::new(Arc::clone(table), submessage, config)?;
            by_field.insert(field.number(), table.id);
            members.insert(table.id, Member { field: field.number(), converter });
        }

        for table in group.members() {
            if !members.contains_key(&table.id) {
                return Err(mismatch(format!("table {} has no field", table.qualified_name())));
            }
        }

        debug!(group = group.name(), message = message.full_name(), members = members.len(), "Bound group converter");
        Ok(Self { group, message, members, by_field })
    }

    /// The bound group.
    pub fn group(&self) -> &Arc<TableGroup> {
        &self.group
    }

    /// The group message type.
    pub fn message(&self) -> &MessageDescriptor {
        &self.message
    }

    /// Whether `table_id` is a member of the group.
    pub fn contains(&self, table_id: TableId) -> bool {
        self.members.contains_key(&table_id)
    }

    /// Converter for one member table.
    pub fn table_converter(&self, table_id: TableId) -> Option<&TableConverter> {
        self.members.get(&table_id).map(|m| &m.converter)
    }

    /// Group field holding rows of `table_id`.
    pub fn field_for(&self, table_id: TableId) -> Option<u32> {
        self.members.get(&table_id).map(|m| m.field)
    }

    fn member(&self, table_id: TableId) -> Result<&Member, ConversionError> {
        self.members.get(&table_id).context(UnknownTableSnafu { group: self.group.name(), table_id })
    }

    /// Encodes `row` as a group message with the row's member field set.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::UnknownTable`] if the row's table is not a
    /// member, or any error from [`TableConverter::encode`].
    pub fn encode(&self, row: &Row) -> Result<DynamicMessage, ConversionError> {
        let member = self.member(row.table_id)?;
        let inner = member.converter.encode(row)?;
        let mut message = DynamicMessage::new(self.message.clone());
        message.set_field(member.field, WireValue::Message(inner)).context(WireSnafu)?;
        Ok(message)
    }

    /// Decodes a group message into the row of whichever member it holds.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidGroupMessage`] unless exactly one
    /// member field is populated, or any error from [`TableConverter::decode`].
    pub fn decode(&self, message: &DynamicMessage) -> Result<Row, ConversionError> {
        let mut populated = message
            .fields()
            .filter_map(|(number, value)| self.by_field.get(&number).map(|id| (*id, value)));
        let (Some((table_id, value)), None) = (populated.next(), populated.next()) else {
            let count = message.fields().filter(|(n, _)| self.by_field.contains_key(n)).count();
            error!(message = self.message.full_name(), populated = count, "Group message does not hold one row");
            return Err(ConversionError::InvalidGroupMessage {
                message_type: self.message.full_name().to_string(),
                populated: count,
            });
        };
        let member = self.member(table_id)?;
        match value {
            WireValue::Message(inner) => member.converter.decode(inner),
            other => Err(ConversionError::WireKindMismatch {
                column: member.converter.table().qualified_name(),
                expected: FieldKind::Message,
                found: other.kind_name(),
            }),
        }
    }

    /// Encodes `row` as its member table's own message, without the group
    /// wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::UnknownTable`] if the row's table is not a
    /// member, or any error from [`TableConverter::encode`].
    pub fn encode_table(&self, row: &Row) -> Result<DynamicMessage, ConversionError> {
        self.member(row.table_id)?.converter.encode(row)
    }

    /// Decodes a member table's own message.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::UnknownTable`] if `table_id` is not a
    /// member, or any error from [`TableConverter::decode`].
    pub fn decode_table(&self, table_id: TableId, message: &DynamicMessage) -> Result<Row, ConversionError> {
        self.member(table_id)?.converter.decode(message)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use tessera_proto::WireSchema;
    use tessera_test_utils::{fixtures, wire};
    use tessera_types::Value;

    use super::*;

    fn shop() -> (Arc<TableGroup>, WireSchema, GroupConverter) {
        let group = fixtures::orders_items_group();
        let schema = wire::group_schema(&group);
        let message = schema.message(wire::GROUP_MESSAGE).unwrap().clone();
        let converter = GroupConverter::new(Arc::clone(&group), message, &RowFormatConfig::default()).unwrap();
        (group, schema, converter)
    }

    #[test]
    fn test_member_rows_roundtrip_through_group_message() {
        let (group, _, converter) = shop();
        let orders = group.root().unwrap();
        let items = group.members()[1].clone();
        let order = Row::new(orders.id, [Value::Int(1), Value::Decimal(Decimal::from_str("42.50").unwrap())]);
        let item = Row::new(items.id, [Value::Int(1), Value::Int(10), Value::Int(3)]);

        for row in [order, item] {
            let message = converter.encode(&row).unwrap();
            assert_eq!(message.populated(), 1);
            let bytes = message.encode_to_vec();
            let parsed = DynamicMessage::decode(converter.message(), bytes.as_slice()).unwrap();
            assert_eq!(converter.decode(&parsed).unwrap(), row);
        }
    }

    #[test]
    fn test_populated_field_selects_member() {
        let (group, _, converter) = shop();
        let items = group.members()[1].clone();
        let row = Row::new(items.id, [Value::Int(2), Value::Int(20), Value::Null]);
        let message = converter.encode(&row).unwrap();
        let field = converter.field_for(items.id).unwrap();
        assert!(message.has(field));
        assert_eq!(converter.decode(&message).unwrap().table_id, items.id);
    }

    #[test]
    fn test_empty_and_double_group_messages_are_internal_errors() {
        let (group, _, converter) = shop();
        let empty = DynamicMessage::new(converter.message().clone());
        let err = converter.decode(&empty).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidGroupMessage { populated: 0, .. }));
        assert!(err.is_internal());

        let orders = group.root().unwrap();
        let items = group.members()[1].clone();
        let mut double = converter.encode(&Row::new(orders.id, [Value::Int(1), Value::Null])).unwrap();
        let item = converter.encode_table(&Row::new(items.id, [Value::Int(1), Value::Int(1), Value::Int(1)])).unwrap();
        double.set_field(converter.field_for(items.id).unwrap(), WireValue::Message(item)).unwrap();
        assert!(matches!(converter.decode(&double), Err(ConversionError::InvalidGroupMessage { populated: 2, .. })));
    }

    #[test]
    fn test_foreign_table_is_rejected() {
        let (_, _, converter) = shop();
        let row = Row::new(TableId::new(999), [Value::Int(1)]);
        assert!(matches!(converter.encode(&row), Err(ConversionError::UnknownTable { .. })));
        assert!(converter.encode_table(&row).is_err());
    }

    #[test]
    fn test_table_level_encoding_skips_wrapper() {
        let (group, _, converter) = shop();
        let orders = group.root().unwrap();
        let row = Row::new(orders.id, [Value::Int(9), Value::Null]);
        let message = converter.encode_table(&row).unwrap();
        assert_eq!(message.descriptor().table_uuid(), Some(orders.uuid));
        assert_eq!(converter.decode_table(orders.id, &message).unwrap(), row);
    }

    #[test]
    fn test_member_without_field_is_rejected() {
        let group = fixtures::orders_items_group();
        let mut proto = wire::group_schema(&group).proto().clone();
        let group_message = proto.messages.iter_mut().find(|m| m.name == wire::GROUP_MESSAGE).unwrap();
        group_message.fields.pop();
        let schema = WireSchema::compile(proto).unwrap();
        let message = schema.message(wire::GROUP_MESSAGE).unwrap().clone();
        let err = GroupConverter::new(group, message, &RowFormatConfig::default()).unwrap_err();
        assert!(err.to_string().contains("has no field"), "{err}");
    }

    #[test]
    fn test_unreachable_table_is_not_a_member() {
        let (orders, items) = fixtures::orders_items();
        let lines = fixtures::all_types_table();

        let mut flat = TableGroup::new("shop.orders", Arc::clone(&orders));
        flat.add_child(orders.id, Arc::clone(&lines)).unwrap();
        let schema = wire::group_schema(&flat);
        let message = schema.message(wire::GROUP_MESSAGE).unwrap().clone();

        // lines stays registered after its parent is dropped, but is unreachable
        let mut pruned = TableGroup::new("shop.orders", orders);
        pruned.add_child(fixtures::ORDERS_ID, items).unwrap();
        pruned.add_child(fixtures::ITEMS_ID, lines).unwrap();
        pruned.remove_table(fixtures::ITEMS_ID).unwrap();
        assert!(pruned.table(fixtures::ALL_TYPES_ID).is_some());
        assert!(!pruned.is_member(fixtures::ALL_TYPES_ID));

        let err = GroupConverter::new(Arc::new(pruned), message, &RowFormatConfig::default()).unwrap_err();
        assert!(err.to_string().contains("names no member table"), "{err}");
    }
}
