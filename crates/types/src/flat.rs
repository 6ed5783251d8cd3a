//! Legacy flat row layout.
//!
//! Before structured rows existed, storage engines exchanged rows as a
//! single flat byte buffer. The layout is kept for callers that still
//! pack and expand rows through that path:
//!
//! ```text
//! [table id: u32 BE][column count: u16 BE][null bitmap][payload]*
//! ```
//!
//! The null bitmap holds one bit per column, least significant bit first.
//! A payload follows for every non-null column in column order. Numeric
//! and temporal payloads are fixed-width big-endian; strings, byte
//! strings and decimals carry a `u32` big-endian length prefix.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Datelike, NaiveDate, Timelike};
use rust_decimal::Decimal;
use snafu::{ResultExt, ensure};

use crate::{
    column::{Column, ColumnType},
    error::{ArityMismatchSnafu, InvalidPayloadSnafu, RowError, TableMismatchSnafu, TruncatedSnafu, WriteSnafu},
    row::Row,
    schema::Table,
    types::TableId,
    value::Value,
};

/// Size of the fixed header: table id plus column count.
pub const FLAT_HEADER_LEN: usize = 6;

/// A row in the legacy flat layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    bytes: Vec<u8>,
}

impl FlatRow {
    /// Wraps raw bytes after checking the header is present.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::Truncated`] if `bytes` is shorter than the header.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RowError> {
        let mut cursor = Cursor::new(bytes.as_slice());
        let mut header = [0u8; FLAT_HEADER_LEN];
        cursor.read_exact(&mut header).context(TruncatedSnafu)?;
        Ok(Self { bytes })
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the row, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Table id from the header.
    pub fn table_id(&self) -> TableId {
        TableId::new(u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]]))
    }

    /// Column count from the header.
    pub fn column_count(&self) -> usize {
        usize::from(u16::from_be_bytes([self.bytes[4], self.bytes[5]]))
    }

    /// Flattens `row`, which must belong to `table`.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] if the row belongs to another table, has the
    /// wrong number of values, or holds a value its column cannot store.
    pub fn from_row(table: &Table, row: &Row) -> Result<Self, RowError> {
        ensure!(row.table_id == table.id, TableMismatchSnafu { expected: table.id, found: row.table_id });
        ensure!(
            row.values.len() == table.width(),
            ArityMismatchSnafu {
                table: table.qualified_name(),
                expected: table.width(),
                found: row.values.len(),
            }
        );
        let count = u16::try_from(table.width()).map_err(|_| RowError::InvalidPayload {
            column: table.qualified_name(),
            reason: format!("{} columns exceed the flat layout limit", table.width()),
        })?;

        let bitmap_len = table.width().div_ceil(8);
        let mut bytes = Vec::with_capacity(FLAT_HEADER_LEN + bitmap_len + table.width() * 8);
        bytes.write_u32::<BigEndian>(table.id.value()).context(WriteSnafu)?;
        bytes.write_u16::<BigEndian>(count).context(WriteSnafu)?;

        let mut bitmap = vec![0u8; bitmap_len];
        for (i, value) in row.values.iter().enumerate() {
            if value.is_null() {
                bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        bytes.extend_from_slice(&bitmap);

        for (column, value) in table.columns.iter().zip(&row.values) {
            if !value.is_null() {
                write_payload(&mut bytes, column, value)?;
            }
        }
        Ok(Self { bytes })
    }

    /// Expands this row against `table`.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] if the header names another table or column
    /// count, or if a payload is truncated or malformed.
    pub fn to_row(&self, table: &Table) -> Result<Row, RowError> {
        let mut cursor = Cursor::new(self.bytes.as_slice());
        let table_id = TableId::new(cursor.read_u32::<BigEndian>().context(TruncatedSnafu)?);
        ensure!(table_id == table.id, TableMismatchSnafu { expected: table.id, found: table_id });
        let count = usize::from(cursor.read_u16::<BigEndian>().context(TruncatedSnafu)?);
        ensure!(
            count == table.width(),
            ArityMismatchSnafu { table: table.qualified_name(), expected: table.width(), found: count }
        );

        let mut bitmap = vec![0u8; count.div_ceil(8)];
        cursor.read_exact(&mut bitmap).context(TruncatedSnafu)?;

        let mut values = Vec::with_capacity(count);
        for (i, column) in table.columns.iter().enumerate() {
            if bitmap[i / 8] & (1 << (i % 8)) != 0 {
                values.push(Value::Null);
            } else {
                values.push(read_payload(&mut cursor, column)?);
            }
        }
        Ok(Row { table_id, values })
    }
}

fn write_payload(out: &mut Vec<u8>, column: &Column, value: &Value) -> Result<(), RowError> {
    match (column.column_type, value) {
        (ColumnType::Boolean, Value::Bool(v)) => out.write_u8(u8::from(*v)).context(WriteSnafu),
        (ColumnType::Integer { unsigned: false, .. }, Value::Int(v)) => {
            out.write_i64::<BigEndian>(*v).context(WriteSnafu)
        },
        (ColumnType::Integer { unsigned: true, .. }, Value::UInt(v)) => {
            out.write_u64::<BigEndian>(*v).context(WriteSnafu)
        },
        (ColumnType::Float, Value::Float(v)) => out.write_f32::<BigEndian>(*v).context(WriteSnafu),
        (ColumnType::Double, Value::Double(v)) => out.write_f64::<BigEndian>(*v).context(WriteSnafu),
        (ColumnType::Decimal { .. }, Value::Decimal(v)) => write_prefixed(out, column, v.to_string().as_bytes()),
        (ColumnType::Char { .. } | ColumnType::Varchar { .. } | ColumnType::Text, Value::String(v)) => {
            write_prefixed(out, column, v.as_bytes())
        },
        (ColumnType::Binary { .. } | ColumnType::Varbinary { .. } | ColumnType::Blob, Value::Bytes(v)) => {
            write_prefixed(out, column, v)
        },
        (ColumnType::Date, Value::Date(v)) => {
            out.write_i32::<BigEndian>(v.num_days_from_ce()).context(WriteSnafu)
        },
        (ColumnType::DateTime, Value::DateTime(v)) => {
            ensure!(
                v.nanosecond() == 0,
                InvalidPayloadSnafu { column: column.name.clone(), reason: format!("DATETIME {v} has fractional seconds") }
            );
            out.write_i64::<BigEndian>(v.and_utc().timestamp()).context(WriteSnafu)
        },
        (ColumnType::Time, Value::Time(v)) => out.write_i32::<BigEndian>(*v).context(WriteSnafu),
        (ColumnType::Year, Value::Year(v)) => out.write_u16::<BigEndian>(*v).context(WriteSnafu),
        (ColumnType::Timestamp, Value::Timestamp(v)) => {
            out.write_u32::<BigEndian>(*v).context(WriteSnafu)
        },
        (column_type, value) => Err(RowError::ValueMismatch {
            column: column.name.clone(),
            expected: column_type.to_string(),
            found: value.type_name(),
        }),
    }
}

fn write_prefixed(out: &mut Vec<u8>, column: &Column, payload: &[u8]) -> Result<(), RowError> {
    let len = u32::try_from(payload.len()).map_err(|_| RowError::InvalidPayload {
        column: column.name.clone(),
        reason: format!("payload of {} bytes exceeds u32", payload.len()),
    })?;
    out.write_u32::<BigEndian>(len).context(WriteSnafu)?;
    out.extend_from_slice(payload);
    Ok(())
}

fn read_prefixed(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, RowError> {
    let len = cursor.read_u32::<BigEndian>().context(TruncatedSnafu)? as usize;
    let remaining = cursor.get_ref().len().saturating_sub(cursor.position() as usize);
    if len > remaining {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)).context(TruncatedSnafu);
    }
    let mut payload = vec![0u8; len];
    cursor.read_exact(&mut payload).context(TruncatedSnafu)?;
    Ok(payload)
}

fn read_payload(cursor: &mut Cursor<&[u8]>, column: &Column) -> Result<Value, RowError> {
    let invalid = |reason: String| RowError::InvalidPayload { column: column.name.clone(), reason };

    let value = match column.column_type {
        ColumnType::Boolean => Value::Bool(cursor.read_u8().context(TruncatedSnafu)? != 0),
        ColumnType::Integer { unsigned: false, .. } => {
            Value::Int(cursor.read_i64::<BigEndian>().context(TruncatedSnafu)?)
        },
        ColumnType::Integer { unsigned: true, .. } => {
            Value::UInt(cursor.read_u64::<BigEndian>().context(TruncatedSnafu)?)
        },
        ColumnType::Float => Value::Float(cursor.read_f32::<BigEndian>().context(TruncatedSnafu)?),
        ColumnType::Double => Value::Double(cursor.read_f64::<BigEndian>().context(TruncatedSnafu)?),
        ColumnType::Decimal { .. } => {
            let text = String::from_utf8(read_prefixed(cursor)?).map_err(|e| invalid(e.to_string()))?;
            Value::Decimal(text.parse::<Decimal>().map_err(|e| invalid(e.to_string()))?)
        },
        ColumnType::Char { .. } | ColumnType::Varchar { .. } | ColumnType::Text => {
            Value::String(String::from_utf8(read_prefixed(cursor)?).map_err(|e| invalid(e.to_string()))?)
        },
        ColumnType::Binary { .. } | ColumnType::Varbinary { .. } | ColumnType::Blob => {
            Value::Bytes(read_prefixed(cursor)?)
        },
        ColumnType::Date => {
            let days = cursor.read_i32::<BigEndian>().context(TruncatedSnafu)?;
            Value::Date(
                NaiveDate::from_num_days_from_ce_opt(days)
                    .ok_or_else(|| invalid(format!("day {days} is out of range")))?,
            )
        },
        ColumnType::DateTime => {
            let seconds = cursor.read_i64::<BigEndian>().context(TruncatedSnafu)?;
            let datetime = DateTime::from_timestamp(seconds, 0)
                .ok_or_else(|| invalid(format!("timestamp {seconds} is out of range")))?;
            Value::DateTime(datetime.naive_utc())
        },
        ColumnType::Time => Value::Time(cursor.read_i32::<BigEndian>().context(TruncatedSnafu)?),
        ColumnType::Year => Value::Year(cursor.read_u16::<BigEndian>().context(TruncatedSnafu)?),
        ColumnType::Timestamp => {
            Value::Timestamp(cursor.read_u32::<BigEndian>().context(TruncatedSnafu)?)
        },
    };
    Ok(value)
}
