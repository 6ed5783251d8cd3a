//! Converter between the rows of one table and its wire message.
//!
//! Columns bind to wire fields through the column identity carried in each
//! field's annotations, never through field numbers or names. A wire schema
//! regenerated with renumbered or reordered fields therefore keeps decoding
//! the same rows.

use std::{collections::HashMap, sync::Arc};

use snafu::{ResultExt, ensure};
use tessera_proto::{DynamicMessage, FieldDescriptor, FieldKind, MessageDescriptor, WireValue};
use tessera_types::{Row, RowFormatConfig, Table, TableId, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    conversion::ColumnConversion,
    error::{ArityMismatchSnafu, ConversionError, TableMismatchSnafu, WireSnafu},
};

#[derive(Debug, Clone)]
struct ColumnBinding {
    conversion: ColumnConversion,
    field: Option<u32>,
    null_field: Option<u32>,
}

/// Binds a table's columns to the fields of its wire message.
#[derive(Debug, Clone)]
pub struct TableConverter {
    table: Arc<Table>,
    message: MessageDescriptor,
    columns: Vec<ColumnBinding>,
    by_field: HashMap<u32, usize>,
    by_null_field: HashMap<u32, usize>,
}

impl TableConverter {
    /// Binds `table` to `message`.
    ///
    /// A field annotated with a column identity binds to that column. A
    /// field annotated as the null indicator of another field binds to the
    /// column that field is bound to. Fields naming no column of the table
    /// are ignored, as are null indicators for unbound fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::SchemaMismatch`] if a bound field's kind or
    /// decimal scale differs from the column's codec, if two fields bind the
    /// same column, if a null indicator is not a `bool`, or if
    /// `strict_column_binding` is set and a column has no field.
    pub fn new(
        table: Arc<Table>,
        message: MessageDescriptor,
        config: &RowFormatConfig,
    ) -> Result<Self, ConversionError> {
        let mismatch = |reason: String| ConversionError::SchemaMismatch {
            message_type: message.full_name().to_string(),
            reason,
        };

        let positions: HashMap<Uuid, usize> =
            table.columns.iter().enumerate().map(|(i, c)| (c.uuid, i)).collect();
        let mut columns: Vec<ColumnBinding> = table
            .columns
            .iter()
            .map(|c| ColumnBinding {
                conversion: ColumnConversion::for_type(c.column_type),
                field: None,
                null_field: None,
            })
            .collect();
        let mut by_field = HashMap::new();
        let mut by_null_field = HashMap::new();

        for field in message.fields().iter().filter(|f| f.null_for_field().is_none()) {
            let Some(uuid) = field.uuid() else { continue };
            let Some(&position) = positions.get(&uuid) else {
                debug!(message = message.full_name(), field = field.name(), %uuid, "Field names no column");
                continue;
            };
            let column = &table.columns[position];
            let binding = &mut columns[position];
            check_field(field, column.name.as_str(), binding.conversion).map_err(mismatch)?;
            if let Some(previous) = binding.field {
                return Err(mismatch(format!(
                    "column {} is bound by fields {previous} and {}",
                    column.name,
                    field.number()
                )));
            }
            binding.field = Some(field.number());
            by_field.insert(field.number(), position);
        }

        for field in message.fields() {
            let Some(target) = field.null_for_field() else { continue };
            let Some(&position) = by_field.get(&target) else {
                warn!(
                    message = message.full_name(),
                    field = field.name(),
                    target,
                    "Null indicator refers to an unbound field, ignoring"
                );
                continue;
            };
            if field.kind() != FieldKind::Bool {
                return Err(mismatch(format!("null indicator {} is {}, not bool", field.name(), field.kind())));
            }
            columns[position].null_field = Some(field.number());
            by_null_field.insert(field.number(), position);
        }

        for (column, binding) in table.columns.iter().zip(&columns) {
            if binding.field.is_none() {
                ensure!(
                    !config.strict_column_binding,
                    crate::error::SchemaMismatchSnafu {
                        message_type: message.full_name(),
                        reason: format!("column {} has no field", column.name),
                    }
                );
                debug!(table = %table.qualified_name(), column = %column.name, "Column has no field, decodes as NULL");
            }
        }

        debug!(
            table = %table.qualified_name(),
            message = message.full_name(),
            bound = by_field.len(),
            indicators = by_null_field.len(),
            "Bound table converter"
        );
        Ok(Self { table, message, columns, by_field, by_null_field })
    }

    /// The bound table.
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Id of the bound table.
    pub fn table_id(&self) -> TableId {
        self.table.id
    }

    /// The bound message type.
    pub fn message(&self) -> &MessageDescriptor {
        &self.message
    }

    /// Field bound to the column at `position`.
    pub fn field_for(&self, position: usize) -> Option<u32> {
        self.columns.get(position).and_then(|b| b.field)
    }

    /// Null indicator field of the column at `position`.
    pub fn null_field_for(&self, position: usize) -> Option<u32> {
        self.columns.get(position).and_then(|b| b.null_field)
    }

    /// Codec of the column at `position`.
    pub fn conversion_for(&self, position: usize) -> Option<ColumnConversion> {
        self.columns.get(position).map(|b| b.conversion)
    }

    /// Encodes a row of the bound table.
    ///
    /// A NULL sets the column's null indicator if it has one and otherwise
    /// leaves the field unset. Values of columns without a field are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::TableMismatch`] or
    /// [`ConversionError::ArityMismatch`] if the row does not belong to the
    /// table, or any error from [`ColumnConversion::encode`].
    pub fn encode(&self, row: &Row) -> Result<DynamicMessage, ConversionError> {
        ensure!(row.table_id == self.table.id, TableMismatchSnafu { expected: self.table.id, found: row.table_id });
        ensure!(
            row.values.len() == self.columns.len(),
            ArityMismatchSnafu {
                table: self.table.qualified_name(),
                expected: self.columns.len(),
                found: row.values.len(),
            }
        );

        let mut message = DynamicMessage::new(self.message.clone());
        for ((column, binding), value) in self.table.columns.iter().zip(&self.columns).zip(&row.values) {
            if value.is_null() {
                if let Some(null_field) = binding.null_field {
                    message.set_field(null_field, WireValue::Bool(true)).context(WireSnafu)?;
                }
                continue;
            }
            let wire = binding.conversion.encode(&column.name, value)?;
            if let Some(field) = binding.field {
                message.set_field(field, wire).context(WireSnafu)?;
            }
        }
        Ok(message)
    }

    /// Decodes a message of the bound type.
    ///
    /// Columns start as NULL. Bound fields fill their columns, then every
    /// null indicator set to `true` forces its column back to NULL.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::SchemaMismatch`] if the message is of
    /// another type, or any error from [`ColumnConversion::decode`].
    pub fn decode(&self, message: &DynamicMessage) -> Result<Row, ConversionError> {
        ensure!(
            *message.descriptor() == self.message,
            crate::error::SchemaMismatchSnafu {
                message_type: self.message.full_name(),
                reason: format!("cannot decode a {}", message.descriptor().full_name()),
            }
        );

        let mut values = vec![Value::Null; self.columns.len()];
        for (number, wire) in message.fields() {
            if let Some(&position) = self.by_field.get(&number) {
                let column = &self.table.columns[position].name;
                values[position] = self.columns[position].conversion.decode(column, wire)?;
            }
        }
        for (number, wire) in message.fields() {
            if let (Some(&position), WireValue::Bool(true)) = (self.by_null_field.get(&number), wire) {
                values[position] = Value::Null;
            }
        }
        Ok(Row { table_id: self.table.id, values })
    }
}

fn check_field(field: &FieldDescriptor, column: &str, conversion: ColumnConversion) -> Result<(), String> {
    if field.kind() != conversion.field_kind() {
        return Err(format!(
            "field {} is {} but column {column} needs {}",
            field.name(),
            field.kind(),
            conversion.field_kind()
        ));
    }
    if let Some(scale) = conversion.decimal_scale() {
        if field.decimal_scale() != Some(scale) {
            return Err(format!(
                "field {} declares scale {:?} but column {column} has scale {scale}",
                field.name(),
                field.decimal_scale()
            ));
        }
    }
    Ok(())
}
