//! Logical column types and column definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::SchemaError, value::Value};

/// Largest decimal precision a [`rust_decimal::Decimal`] can hold exactly.
pub const MAX_DECIMAL_PRECISION: u8 = 28;

/// Storage width of an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    /// TINYINT.
    W8,
    /// SMALLINT.
    W16,
    /// MEDIUMINT.
    W24,
    /// INT.
    W32,
    /// BIGINT.
    W64,
}

impl IntWidth {
    /// Number of significant bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W24 => 24,
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    const fn sql_name(self) -> &'static str {
        match self {
            Self::W8 => "TINYINT",
            Self::W16 => "SMALLINT",
            Self::W24 => "MEDIUMINT",
            Self::W32 => "INT",
            Self::W64 => "BIGINT",
        }
    }
}

/// Logical SQL type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// BOOLEAN.
    Boolean,
    /// Integer of the given width and signedness.
    Integer {
        /// Storage width.
        width: IntWidth,
        /// Whether the column is UNSIGNED.
        unsigned: bool,
    },
    /// Single precision FLOAT.
    Float,
    /// Double precision DOUBLE.
    Double,
    /// Exact DECIMAL(precision, scale). Build with [`ColumnType::decimal`].
    Decimal {
        /// Total number of decimal digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Fixed-length character string.
    Char {
        /// Declared length in characters.
        length: u32,
    },
    /// Variable-length character string.
    Varchar {
        /// Maximum length in characters.
        length: u32,
    },
    /// Unbounded character string.
    Text,
    /// Fixed-length byte string.
    Binary {
        /// Declared length in bytes.
        length: u32,
    },
    /// Variable-length byte string.
    Varbinary {
        /// Maximum length in bytes.
        length: u32,
    },
    /// Unbounded byte string.
    Blob,
    /// Calendar date.
    Date,
    /// Date and time of day, second precision.
    DateTime,
    /// Signed duration in seconds, displayed as `HH:MM:SS`.
    Time,
    /// Calendar year.
    Year,
    /// Seconds since the Unix epoch.
    Timestamp,
}

impl ColumnType {
    /// Signed integer column of the given width.
    pub const fn int(width: IntWidth) -> Self {
        Self::Integer { width, unsigned: false }
    }

    /// Unsigned integer column of the given width.
    pub const fn uint(width: IntWidth) -> Self {
        Self::Integer { width, unsigned: true }
    }

    /// Validated DECIMAL(precision, scale).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDecimal`] if `precision` is zero or
    /// above [`MAX_DECIMAL_PRECISION`], or `scale` exceeds `precision`.
    pub fn decimal(precision: u8, scale: u8) -> Result<Self, SchemaError> {
        let column_type = Self::Decimal { precision, scale };
        column_type.validate()?;
        Ok(column_type)
    }

    /// Checks the type parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDecimal`] for out-of-range decimal parameters.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if let Self::Decimal { precision, scale } = *self {
            let reason = if precision == 0 {
                Some("precision must be at least 1")
            } else if precision > MAX_DECIMAL_PRECISION {
                Some("precision exceeds 28 digits")
            } else if scale > precision {
                Some("scale exceeds precision")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(SchemaError::InvalidDecimal { precision, scale, reason });
            }
        }
        Ok(())
    }

    /// Whether `value` is NULL or the variant this type stores.
    pub const fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (Self::Boolean, Value::Bool(_))
                | (Self::Integer { unsigned: false, .. }, Value::Int(_))
                | (Self::Integer { unsigned: true, .. }, Value::UInt(_))
                | (Self::Float, Value::Float(_))
                | (Self::Double, Value::Double(_))
                | (Self::Decimal { .. }, Value::Decimal(_))
                | (Self::Char { .. } | Self::Varchar { .. } | Self::Text, Value::String(_))
                | (Self::Binary { .. } | Self::Varbinary { .. } | Self::Blob, Value::Bytes(_))
                | (Self::Date, Value::Date(_))
                | (Self::DateTime, Value::DateTime(_))
                | (Self::Time, Value::Time(_))
                | (Self::Year, Value::Year(_))
                | (Self::Timestamp, Value::Timestamp(_))
        )
    }

    /// Whether values of this type are strings or byte strings.
    pub const fn is_variable_length(&self) -> bool {
        matches!(
            self,
            Self::Char { .. }
                | Self::Varchar { .. }
                | Self::Text
                | Self::Binary { .. }
                | Self::Varbinary { .. }
                | Self::Blob
                | Self::Decimal { .. }
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("BOOLEAN"),
            Self::Integer { width, unsigned: false } => f.write_str(width.sql_name()),
            Self::Integer { width, unsigned: true } => write!(f, "{} UNSIGNED", width.sql_name()),
            Self::Float => f.write_str("FLOAT"),
            Self::Double => f.write_str("DOUBLE"),
            Self::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            Self::Char { length } => write!(f, "CHAR({length})"),
            Self::Varchar { length } => write!(f, "VARCHAR({length})"),
            Self::Text => f.write_str("TEXT"),
            Self::Binary { length } => write!(f, "BINARY({length})"),
            Self::Varbinary { length } => write!(f, "VARBINARY({length})"),
            Self::Blob => f.write_str("BLOB"),
            Self::Date => f.write_str("DATE"),
            Self::DateTime => f.write_str("DATETIME"),
            Self::Time => f.write_str("TIME"),
            Self::Year => f.write_str("YEAR"),
            Self::Timestamp => f.write_str("TIMESTAMP"),
        }
    }
}

/// A column of a table.
///
/// The `uuid` is the column's stable identity: it survives renames and
/// schema regeneration, and is what the wire schema binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Stable identity.
    pub uuid: Uuid,
    /// Logical type.
    pub column_type: ColumnType,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether the column declares a default value or function.
    pub has_default: bool,
    /// Hidden engine column such as a generated primary key.
    pub internal: bool,
}

#[bon::bon]
impl Column {
    /// Creates a column definition.
    #[builder]
    pub fn new(
        #[builder(into)] name: String,
        column_type: ColumnType,
        #[builder(default = Uuid::new_v4())] uuid: Uuid,
        #[builder(default = true)] nullable: bool,
        #[builder(default)] has_default: bool,
        #[builder(default)] internal: bool,
    ) -> Self {
        Self { name, uuid, column_type, nullable, has_default, internal }
    }
}
