//! Wire schema generation for tests.
//!
//! Mirrors the generator that produces persisted wire schemas: one message
//! per table with a field per column in declaration order, followed by a
//! `<column>_is_null` indicator for every nullable column. Group schemas
//! add a flagged [`GROUP_MESSAGE`] with one field per member table.

use tessera_proto::{
    ColumnOptions, FieldKind, FieldProto, MessageProto, TableOptions, WireSchema, WireSchemaProto,
};
use tessera_types::{ColumnType, IntWidth, Table, TableGroup};

/// Name of the generated group message.
pub const GROUP_MESSAGE: &str = "_Group";

/// Wire kind the generator assigns to a column type.
#[must_use]
pub fn field_kind(column_type: ColumnType) -> FieldKind {
    match column_type {
        ColumnType::Boolean => FieldKind::Bool,
        ColumnType::Integer { width: IntWidth::W64, unsigned: false } => FieldKind::Sint64,
        ColumnType::Integer { width: IntWidth::W64, unsigned: true } => FieldKind::Uint64,
        ColumnType::Integer { unsigned: false, .. } => FieldKind::Sint32,
        ColumnType::Integer { unsigned: true, .. } | ColumnType::Timestamp => FieldKind::Uint32,
        ColumnType::Float => FieldKind::Float,
        ColumnType::Double => FieldKind::Double,
        ColumnType::Decimal { precision, .. } if precision < 19 => FieldKind::Sint64,
        ColumnType::Decimal { .. }
        | ColumnType::Binary { .. }
        | ColumnType::Varbinary { .. }
        | ColumnType::Blob => FieldKind::Bytes,
        ColumnType::Char { .. }
        | ColumnType::Varchar { .. }
        | ColumnType::Text
        | ColumnType::Date
        | ColumnType::DateTime => FieldKind::String,
        ColumnType::Time | ColumnType::Year => FieldKind::Sint32,
    }
}

fn table_proto(table: &Table) -> MessageProto {
    let mut fields = Vec::with_capacity(table.width() * 2);
    for (column, number) in table.columns.iter().zip(1u32..) {
        let decimal_scale = match column.column_type {
            ColumnType::Decimal { scale, .. } => Some(i32::from(scale)),
            _ => None,
        };
        fields.push(FieldProto::scalar(&column.name, number, field_kind(column.column_type)).with_options(
            ColumnOptions {
                name: column.name.clone(),
                sql_type: column.column_type.to_string(),
                uuid: column.uuid.to_string(),
                null_for_field: None,
                decimal_scale,
            },
        ));
    }

    let mut next = u32::try_from(fields.len()).unwrap_or(u32::MAX) + 1;
    for (column, target) in table.columns.iter().zip(1i32..) {
        if column.nullable {
            fields.push(FieldProto::scalar(format!("{}_is_null", column.name), next, FieldKind::Bool).with_options(
                ColumnOptions { null_for_field: Some(target), ..ColumnOptions::default() },
            ));
            next += 1;
        }
    }

    MessageProto {
        name: table.name.clone(),
        fields,
        options: Some(TableOptions {
            name: table.name.clone(),
            schema: table.schema.clone(),
            uuid: table.uuid.to_string(),
            is_group: false,
            next_field: i32::try_from(next).unwrap_or(i32::MAX),
        }),
    }
}

fn compile(proto: WireSchemaProto) -> WireSchema {
    WireSchema::compile(proto).expect("generated wire schema compiles")
}

/// Schema with a single message for `table`.
#[must_use]
pub fn table_schema(table: &Table) -> WireSchema {
    compile(WireSchemaProto { package: table.schema.clone(), messages: vec![table_proto(table)] })
}

/// Schema with a message per member of `group` and a flagged group message.
#[must_use]
pub fn group_schema(group: &TableGroup) -> WireSchema {
    let members = group.members();
    let mut messages: Vec<MessageProto> = members.iter().map(|t| table_proto(t)).collect();
    let fields = members
        .iter()
        .zip(1u32..)
        .map(|(table, number)| {
            FieldProto::message(&table.name, number, &table.name).with_options(ColumnOptions {
                name: table.qualified_name(),
                uuid: table.uuid.to_string(),
                ..ColumnOptions::default()
            })
        })
        .collect::<Vec<_>>();
    let next_field = i32::try_from(fields.len()).unwrap_or(i32::MAX) + 1;
    messages.push(MessageProto {
        name: GROUP_MESSAGE.to_string(),
        fields,
        options: Some(TableOptions {
            name: group.name().to_string(),
            is_group: true,
            next_field,
            ..TableOptions::default()
        }),
    });
    let package = group.root().map(|t| t.schema.clone()).unwrap_or_default();
    compile(WireSchemaProto { package, messages })
}

/// Copy of `schema` with every field number shifted by `offset` and, if
/// `reverse` is set, every message's fields declared in reverse order.
///
/// Identity annotations are untouched, so converters bound to either
/// schema convert the same rows.
#[must_use]
pub fn renumbered(schema: &WireSchema, offset: u32, reverse: bool) -> WireSchema {
    let shift = i32::try_from(offset).expect("offset fits a field number");
    let mut proto = schema.proto().clone();
    for message in &mut proto.messages {
        for field in &mut message.fields {
            field.number += offset;
            if let Some(target) = field.options.as_mut().and_then(|o| o.null_for_field.as_mut()) {
                *target += shift;
            }
        }
        if reverse {
            message.fields.reverse();
        }
    }
    compile(proto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_table_schema_layout() {
        let (orders, _) = fixtures::orders_items();
        let schema = table_schema(&orders);
        let message = schema.table_message(orders.uuid).expect("orders message");
        let names: Vec<_> = message.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["id", "total", "total_is_null"]);
        assert_eq!(message.fields()[1].decimal_scale(), Some(2));
        assert_eq!(message.fields()[2].null_for_field(), Some(2));
    }

    #[test]
    fn test_group_schema_flags_one_message() {
        let group = fixtures::orders_items_group();
        let schema = group_schema(&group);
        let flagged: Vec<_> = schema.messages().iter().filter(|m| m.is_group()).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].name(), GROUP_MESSAGE);
        assert_eq!(flagged[0].fields()[1].uuid(), Some(fixtures::ITEMS_UUID));
    }

    #[test]
    fn test_renumbering_keeps_indicator_targets() {
        let (orders, _) = fixtures::orders_items();
        let schema = renumbered(&table_schema(&orders), 40, true);
        let message = schema.table_message(orders.uuid).expect("orders message");
        assert_eq!(message.fields()[0].name(), "total_is_null");
        assert_eq!(message.fields()[0].null_for_field(), Some(42));
    }
}
