//! Column values carried in rows.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// A single column value.
///
/// Each non-null variant corresponds to one family of [`ColumnType`]s.
/// Integer columns of every width carry [`Value::Int`] or [`Value::UInt`];
/// range checks against the declared width happen at conversion time.
///
/// [`ColumnType`]: crate::ColumnType
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// BOOLEAN.
    Bool(bool),
    /// Signed integer of any width.
    Int(i64),
    /// Unsigned integer of any width.
    UInt(u64),
    /// FLOAT.
    Float(f32),
    /// DOUBLE.
    Double(f64),
    /// DECIMAL.
    Decimal(Decimal),
    /// CHAR, VARCHAR and TEXT.
    String(String),
    /// BINARY, VARBINARY and BLOB.
    Bytes(Vec<u8>),
    /// DATE.
    Date(NaiveDate),
    /// DATETIME.
    DateTime(NaiveDateTime),
    /// TIME as signed seconds.
    Time(i32),
    /// YEAR.
    Year(u16),
    /// TIMESTAMP as seconds since the Unix epoch.
    Timestamp(u32),
}

impl Value {
    /// Whether this is SQL NULL.
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in mismatch errors.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Time(_) => "time",
            Self::Year(_) => "year",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "'{v}'"),
            Self::Bytes(v) => {
                f.write_str("0x")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            },
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Self::Time(seconds) => {
                let sign = if *seconds < 0 { "-" } else { "" };
                let total = seconds.unsigned_abs();
                write!(f, "{sign}{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
            },
            Self::Year(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_option_none_is_null() {
        let v: Value = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: Value = Some(5i64).into();
        assert_eq!(v, Value::Int(5));
    }

    #[test]
    fn test_display_time_is_signed_clock() {
        assert_eq!(Value::Time(3_723).to_string(), "01:02:03");
        assert_eq!(Value::Time(-3_723).to_string(), "-01:02:03");
        assert_eq!(Value::Time(0).to_string(), "00:00:00");
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from("abc").to_string(), "'abc'");
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "0xdead");
        assert_eq!(Value::Decimal(Decimal::from_str("12.50").unwrap()).to_string(), "12.50");
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-02-29");
    }

    #[test]
    fn test_type_names_are_distinct() {
        let values = [
            Value::Null,
            Value::Bool(true),
            Value::Int(1),
            Value::UInt(1),
            Value::Float(1.0),
            Value::Double(1.0),
            Value::Decimal(Decimal::ONE),
            Value::from("s"),
            Value::Bytes(vec![]),
            Value::Time(0),
            Value::Year(2000),
            Value::Timestamp(0),
        ];
        let mut names: Vec<_> = values.iter().map(Value::type_name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), values.len());
    }
}
