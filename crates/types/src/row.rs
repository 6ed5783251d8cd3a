//! Logical rows.

use crate::{types::TableId, value::Value};

/// A row of one table: one value per column, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Table the row belongs to.
    pub table_id: TableId,
    /// Column values in the table's column order.
    pub values: Vec<Value>,
}

impl Row {
    /// Creates a row for `table_id` from the given values.
    pub fn new(table_id: TableId, values: impl IntoIterator<Item = Value>) -> Self {
        Self { table_id, values: values.into_iter().collect() }
    }

    /// Creates an all-NULL row with `width` columns.
    pub fn nulls(table_id: TableId, width: usize) -> Self {
        Self { table_id, values: vec![Value::Null; width] }
    }

    /// Number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `position`, if present.
    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }
}
