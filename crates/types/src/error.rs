//! Error types for the logical model using snafu.
//!
//! Defines the errors raised while building tables and groups
//! ([`SchemaError`]) and while converting rows to and from the legacy flat
//! layout ([`RowError`]).
//!
//! Every error across the workspace maps to an [`ErrorCode`] with a unique
//! numeric identifier and an internal-consistency classification. See
//! [`ErrorCode`] for the full catalog.

use core::fmt;
use std::io;

use snafu::{Location, Snafu};

use crate::types::TableId;

/// Machine-readable error codes for programmatic error handling.
///
/// | Range     | Domain     | Examples                                       |
/// |-----------|------------|------------------------------------------------|
/// | 1000–1099 | Schema     | Invalid logical schema, wire schema mismatch   |
/// | 1100–1199 | Wire       | Malformed protobuf bytes                       |
/// | 2000–2099 | Conversion | Value does not fit its column                  |
/// | 3000–3099 | Storage    | Unsupported backend operation, bad framing     |
/// | 9000–9099 | Internal   | Corrupted storage or codec/schema mismatch     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Schema errors (1000–1199) ---
    /// The logical table or group definition is invalid.
    SchemaInvalid = 1000,
    /// The wire schema does not match the logical schema.
    SchemaMismatch = 1001,
    /// Bytes could not be parsed against the expected message type.
    WireDecode = 1100,

    // --- Conversion errors (2000–2099) ---
    /// A value does not match its column's logical type.
    ValueMismatch = 2000,
    /// A value cannot be represented in its column's declared precision.
    ValueOverflow = 2001,
    /// A legacy flat row is truncated or malformed.
    FlatRowMalformed = 2002,

    // --- Storage errors (3000–3099) ---
    /// The backend does not support the requested operation.
    StorageUnsupported = 3000,
    /// A stored value is framed incorrectly.
    StorageFraming = 3001,

    // --- Internal consistency (9000–9099) ---
    /// Stored data contradicts the converter bound to it.
    InternalConsistency = 9000,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::SchemaInvalid),
            1001 => Some(Self::SchemaMismatch),
            1100 => Some(Self::WireDecode),
            2000 => Some(Self::ValueMismatch),
            2001 => Some(Self::ValueOverflow),
            2002 => Some(Self::FlatRowMalformed),
            3000 => Some(Self::StorageUnsupported),
            3001 => Some(Self::StorageFraming),
            9000 => Some(Self::InternalConsistency),
            _ => None,
        }
    }

    /// Whether this error indicates corrupted storage or a codec/schema
    /// mismatch rather than a caller mistake.
    ///
    /// Internal errors are never recoverable by retrying the same call.
    #[must_use]
    pub const fn is_internal(self) -> bool {
        matches!(self, Self::InternalConsistency | Self::StorageFraming)
    }

    /// Suggested recovery action for this error code.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::SchemaInvalid => "Fix the table definition and recreate it.",
            Self::SchemaMismatch => {
                "Regenerate the wire schema from the current table definition."
            },
            Self::WireDecode => {
                "The stored bytes do not parse as the expected message. Check for corruption."
            },
            Self::ValueMismatch => "Cast the value to the column's type before storing it.",
            Self::ValueOverflow => "Round or widen the value to fit the column's precision.",
            Self::FlatRowMalformed => "Rebuild the flat row from a well-formed row.",
            Self::StorageUnsupported => "Use the structured row API for this backend.",
            Self::StorageFraming => {
                "The stored value frame is damaged. Restore the row from a backup."
            },
            Self::InternalConsistency => {
                "Stored data contradicts its schema. Run an integrity check and report the issue."
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Errors raised while building the logical model.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SchemaError {
    /// Decimal precision or scale is outside the supported range.
    #[snafu(display("Invalid DECIMAL({precision},{scale}): {reason}"))]
    InvalidDecimal {
        /// Declared precision.
        precision: u8,
        /// Declared scale.
        scale: u8,
        /// Why the declaration was rejected.
        reason: &'static str,
    },

    /// A table declares no columns.
    #[snafu(display("Table {table} has no columns"))]
    EmptyTable {
        /// Qualified table name.
        table: String,
    },

    /// Two columns share a name or identity.
    #[snafu(display("Table {table} declares column {column} twice"))]
    DuplicateColumn {
        /// Qualified table name.
        table: String,
        /// Offending column name.
        column: String,
    },

    /// A table id is already present in the group.
    #[snafu(display("Group {group} already contains {id}"))]
    DuplicateTable {
        /// Group name.
        group: String,
        /// Duplicated table id.
        id: TableId,
    },

    /// A referenced table is not part of the group.
    #[snafu(display("Group {group} does not contain {id}"))]
    UnknownTable {
        /// Group name.
        group: String,
        /// Missing table id.
        id: TableId,
    },
}

impl SchemaError {
    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::SchemaInvalid
    }
}

/// Errors raised while converting rows to and from the flat layout.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RowError {
    /// The flat row ended before all declared fields were read.
    #[snafu(display("Flat row truncated at {location}: {source}"))]
    Truncated {
        /// The underlying read error.
        source: io::Error,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Writing into the flat row buffer failed.
    #[snafu(display("Flat row write failed: {source}"))]
    Write {
        /// The underlying write error.
        source: io::Error,
    },

    /// The row belongs to a different table.
    #[snafu(display("Row belongs to {found}, expected {expected}"))]
    TableMismatch {
        /// Table the caller expected.
        expected: TableId,
        /// Table the row carries.
        found: TableId,
    },

    /// The row carries a different number of values than its table has columns.
    #[snafu(display("Row for {table} has {found} values, expected {expected}"))]
    ArityMismatch {
        /// Qualified table name.
        table: String,
        /// Column count of the table.
        expected: usize,
        /// Value count of the row.
        found: usize,
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

    /// A payload could not be interpreted as its column's type.
    #[snafu(display("Column {column} payload is invalid: {reason}"))]
    InvalidPayload {
        /// Column name.
        column: String,
        /// Why the payload was rejected.
        reason: String,
    },
}

impl RowError {
    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ValueMismatch { .. } | Self::TableMismatch { .. } | Self::ArityMismatch { .. } => {
                ErrorCode::ValueMismatch
            },
            Self::Truncated { .. } | Self::Write { .. } | Self::InvalidPayload { .. } => {
                ErrorCode::FlatRowMalformed
            },
        }
    }
}
