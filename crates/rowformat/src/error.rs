//! Conversion errors.

use snafu::{Location, Snafu};
use tessera_proto::{FieldKind, WireError};
use tessera_types::{ErrorCode, TableId};

/// Errors raised while binding converters and converting rows.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConversionError {
    /// The wire schema does not fit the logical schema.
    #[snafu(display("Wire schema {message_type} does not match: {reason}"))]
    SchemaMismatch {
        /// Message type being bound.
        message_type: String,
        /// What does not match.
        reason: String,
    },

    /// A value does not match its column's type.
    #[snafu(display("Column {column} expects {expected}, found {found}"))]
    ValueMismatch {
        /// Column name.
        column: String,
        /// SQL type of the column.
        expected: String,
        /// Type name of the supplied value.
        found: &'static str,
    },

    /// A decimal does not fit the column's declared precision and scale.
    #[snafu(display("Column {column}: {value} does not fit DECIMAL({precision},{scale})"))]
    DecimalOverflow {
        /// Column name.
        column: String,
        /// The rejected value.
        value: String,
        /// Declared precision.
        precision: u8,
        /// Declared scale.
        scale: u8,
    },

    /// A value is outside the range its wire representation can carry.
    #[snafu(display("Column {column}: {reason}"))]
    ValueOutOfRange {
        /// Column name.
        column: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A stored field holds a value its column cannot decode.
    #[snafu(display("Column {column} has an invalid stored value: {reason}"))]
    InvalidWireValue {
        /// Column name.
        column: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A stored field carries a different wire kind than its codec reads.
    #[snafu(display("Column {column} expects a {expected} field, found {found}"))]
    WireKindMismatch {
        /// Column name.
        column: String,
        /// Kind the codec reads.
        expected: FieldKind,
        /// Kind of the stored value.
        found: &'static str,
    },

    /// The row belongs to a different table than the converter.
    #[snafu(display("Row belongs to {found}, expected {expected}"))]
    TableMismatch {
        /// Table of the converter.
        expected: TableId,
        /// Table of the row.
        found: TableId,
    },

    /// The row carries a different number of values than its table has columns.
    #[snafu(display("Row for {table} has {found} values, expected {expected}"))]
    ArityMismatch {
        /// Qualified table name.
        table: String,
        /// Column count.
        expected: usize,
        /// Value count.
        found: usize,
    },

    /// The table is not a member of the converter's group.
    #[snafu(display("{table_id} is not a member of group {group}"))]
    UnknownTable {
        /// Group name.
        group: String,
        /// Requested table.
        table_id: TableId,
    },

    /// A group message does not hold exactly one member row.
    #[snafu(display("Group message {message_type} has {populated} populated fields, expected 1"))]
    InvalidGroupMessage {
        /// Group message type.
        message_type: String,
        /// Number of populated top-level fields.
        populated: usize,
    },

    /// Building or parsing a message failed.
    #[snafu(display("Wire error at {location}: {source}"))]
    Wire {
        /// The underlying wire error.
        source: WireError,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },
}

impl ConversionError {
    /// Returns the machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::ValueMismatch { .. }
            | Self::TableMismatch { .. }
            | Self::ArityMismatch { .. }
            | Self::UnknownTable { .. } => ErrorCode::ValueMismatch,
            Self::DecimalOverflow { .. } | Self::ValueOutOfRange { .. } => ErrorCode::ValueOverflow,
            Self::InvalidWireValue { .. } | Self::WireKindMismatch { .. } => ErrorCode::WireDecode,
            Self::InvalidGroupMessage { .. } => ErrorCode::InternalConsistency,
            Self::Wire { source, .. } => source.code(),
        }
    }

    /// Whether this error means stored data contradicts its converter.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.code().is_internal()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_group_message_violation_is_internal() {
        let err = ConversionError::InvalidGroupMessage { message_type: "shop._Group".to_string(), populated: 2 };
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "Group message shop._Group has 2 populated fields, expected 1");
    }

    #[test]
    fn test_caller_errors_are_not_internal() {
        let err = ConversionError::DecimalOverflow {
            column: "total".to_string(),
            value: "1000".to_string(),
            precision: 5,
            scale: 2,
        };
        assert!(!err.is_internal());
        assert_eq!(err.code(), ErrorCode::ValueOverflow);
    }

    #[test]
    fn test_wire_errors_keep_their_code() {
        let err = ConversionError::Wire {
            source: WireError::UnknownMessage { name: "x".to_string() },
            location: snafu::location!(),
        };
        assert_eq!(err.code(), ErrorCode::SchemaMismatch);
    }
}
