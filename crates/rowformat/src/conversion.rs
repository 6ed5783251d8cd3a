//! Per-column codecs between logical values and wire values.
//!
//! [`ColumnConversion::for_type`] selects a strategy once, when a converter
//! binds a column to a wire field. Encoding and decoding then dispatch on
//! the strategy, never on the column type again.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use tessera_proto::{FieldKind, WireValue};
use tessera_types::{ColumnType, IntWidth, Value};

use crate::{
    decimal::{self, PackedDecimalError},
    error::ConversionError,
};

/// Highest decimal precision stored as a scaled 64-bit integer.
///
/// `i64::MAX` has 19 digits but not every 19-digit mantissa fits, so the
/// 64-bit form stops at 18.
pub const DECIMAL_AS_LONG_MAX_PRECISION: u8 = 18;

/// Wire format of DATE values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wire format of DATETIME values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset subtracted from YEAR values on the wire.
pub const YEAR_OFFSET: i32 = 1900;

/// Logical integer a narrowing codec decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerTarget {
    /// Signed integer of the given width.
    Signed(IntWidth),
    /// Unsigned integer of the given width.
    Unsigned(IntWidth),
    /// TIMESTAMP seconds.
    Timestamp,
}

/// Codec for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConversion {
    /// Value and wire representations coincide: BOOLEAN, FLOAT, DOUBLE and
    /// character strings.
    Compatible {
        /// Wire kind.
        kind: FieldKind,
    },
    /// Integers, narrowed to their logical width on decode.
    Integer {
        /// Wire kind.
        kind: FieldKind,
        /// Logical target.
        target: IntegerTarget,
    },
    /// Byte strings.
    Bytes,
    /// DATE as `YYYY-MM-DD`.
    Date,
    /// DATETIME as `YYYY-MM-DD HH:MM:SS`.
    DateTime,
    /// TIME as a signed packed `±HHMMSS` integer.
    Time,
    /// YEAR as an offset from 1900.
    Year,
    /// DECIMAL up to 18 digits as its unscaled 64-bit integer.
    DecimalAsLong {
        /// Declared precision.
        precision: u8,
        /// Declared scale.
        scale: u8,
    },
    /// Wider DECIMAL in the packed decimal byte layout.
    DecimalAsBytes {
        /// Declared precision.
        precision: u8,
        /// Declared scale.
        scale: u8,
    },
}

impl ColumnConversion {
    /// Selects the codec for a column type.
    pub const fn for_type(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Boolean => Self::Compatible { kind: FieldKind::Bool },
            ColumnType::Float => Self::Compatible { kind: FieldKind::Float },
            ColumnType::Double => Self::Compatible { kind: FieldKind::Double },
            ColumnType::Char { .. } | ColumnType::Varchar { .. } | ColumnType::Text => {
                Self::Compatible { kind: FieldKind::String }
            },
            ColumnType::Integer { width: IntWidth::W64, unsigned: false } => {
                Self::Integer { kind: FieldKind::Sint64, target: IntegerTarget::Signed(IntWidth::W64) }
            },
            ColumnType::Integer { width: IntWidth::W64, unsigned: true } => {
                Self::Integer { kind: FieldKind::Uint64, target: IntegerTarget::Unsigned(IntWidth::W64) }
            },
            ColumnType::Integer { width, unsigned: false } => {
                Self::Integer { kind: FieldKind::Sint32, target: IntegerTarget::Signed(width) }
            },
            ColumnType::Integer { width, unsigned: true } => {
                Self::Integer { kind: FieldKind::Uint32, target: IntegerTarget::Unsigned(width) }
            },
            ColumnType::Timestamp => {
                Self::Integer { kind: FieldKind::Uint32, target: IntegerTarget::Timestamp }
            },
            ColumnType::Binary { .. } | ColumnType::Varbinary { .. } | ColumnType::Blob => Self::Bytes,
            ColumnType::Date => Self::Date,
            ColumnType::DateTime => Self::DateTime,
            ColumnType::Time => Self::Time,
            ColumnType::Year => Self::Year,
            ColumnType::Decimal { precision, scale } if precision <= DECIMAL_AS_LONG_MAX_PRECISION => {
                Self::DecimalAsLong { precision, scale }
            },
            ColumnType::Decimal { precision, scale } => Self::DecimalAsBytes { precision, scale },
        }
    }

    /// Wire kind of the bound field.
    pub const fn field_kind(&self) -> FieldKind {
        match self {
            Self::Compatible { kind } | Self::Integer { kind, .. } => *kind,
            Self::Bytes | Self::DecimalAsBytes { .. } => FieldKind::Bytes,
            Self::Date | Self::DateTime => FieldKind::String,
            Self::Time | Self::Year => FieldKind::Sint32,
            Self::DecimalAsLong { .. } => FieldKind::Sint64,
        }
    }

    /// Decimal scale the bound field must declare.
    pub const fn decimal_scale(&self) -> Option<u8> {
        match self {
            Self::DecimalAsLong { scale, .. } | Self::DecimalAsBytes { scale, .. } => Some(*scale),
            _ => None,
        }
    }

    /// Converts a non-null value for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::ValueMismatch`] if the value is of another
    /// type, [`ConversionError::DecimalOverflow`] if a decimal exceeds the
    /// declared precision, and [`ConversionError::ValueOutOfRange`] if a
    /// TIME is beyond what the packed form carries or a DATETIME has
    /// fractional seconds.
    pub fn encode(&self, column: &str, value: &Value) -> Result<WireValue, ConversionError> {
        let wire = match (self, value) {
            (Self::Compatible { kind: FieldKind::Bool }, Value::Bool(v)) => WireValue::Bool(*v),
            (Self::Compatible { kind: FieldKind::Float }, Value::Float(v)) => WireValue::F32(*v),
            (Self::Compatible { kind: FieldKind::Double }, Value::Double(v)) => WireValue::F64(*v),
            (Self::Compatible { kind: FieldKind::String }, Value::String(v)) => WireValue::String(v.clone()),
            (Self::Integer { target: IntegerTarget::Signed(width), .. }, Value::Int(v)) => {
                let narrowed = narrow_signed(*v, *width);
                match width {
                    IntWidth::W64 => WireValue::I64(narrowed),
                    // narrowed to at most 32 bits above
                    _ => WireValue::I32(narrowed as i32),
                }
            },
            (Self::Integer { target: IntegerTarget::Unsigned(width), .. }, Value::UInt(v)) => {
                let narrowed = narrow_unsigned(*v, *width);
                match width {
                    IntWidth::W64 => WireValue::U64(narrowed),
                    _ => WireValue::U32(narrowed as u32),
                }
            },
            (Self::Integer { target: IntegerTarget::Timestamp, .. }, Value::Timestamp(v)) => WireValue::U32(*v),
            (Self::Bytes, Value::Bytes(v)) => WireValue::Bytes(v.clone()),
            (Self::Date, Value::Date(v)) => WireValue::String(v.format(DATE_FORMAT).to_string()),
            (Self::DateTime, Value::DateTime(v)) => {
                if v.nanosecond() != 0 {
                    return Err(ConversionError::ValueOutOfRange {
                        column: column.to_string(),
                        reason: format!("DATETIME {v} has fractional seconds"),
                    });
                }
                WireValue::String(v.format(DATETIME_FORMAT).to_string())
            },
            (Self::Time, Value::Time(v)) => WireValue::I32(pack_time(column, *v)?),
            (Self::Year, Value::Year(v)) => WireValue::I32(i32::from(*v) - YEAR_OFFSET),
            (Self::DecimalAsLong { precision, scale }, Value::Decimal(v)) => {
                WireValue::I64(decimal_to_long(column, v, *precision, *scale)?)
            },
            (Self::DecimalAsBytes { precision, scale }, Value::Decimal(v)) => {
                let packed = decimal::to_packed(v, *precision, *scale)
                    .map_err(|e| packed_error(column, *precision, *scale, e))?;
                WireValue::Bytes(packed)
            },
            (_, value) => {
                return Err(ConversionError::ValueMismatch {
                    column: column.to_string(),
                    expected: self.describe(),
                    found: value.type_name(),
                });
            },
        };
        Ok(wire)
    }

    /// Converts a stored wire value back to a logical value.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::WireKindMismatch`] if the wire value is of
    /// another kind and [`ConversionError::InvalidWireValue`] if it does not
    /// decode to a valid value of the column.
    pub fn decode(&self, column: &str, wire: &WireValue) -> Result<Value, ConversionError> {
        let invalid = |reason: String| ConversionError::InvalidWireValue { column: column.to_string(), reason };

        let value = match (self, wire) {
            (Self::Compatible { kind: FieldKind::Bool }, WireValue::Bool(v)) => Value::Bool(*v),
            (Self::Compatible { kind: FieldKind::Float }, WireValue::F32(v)) => Value::Float(*v),
            (Self::Compatible { kind: FieldKind::Double }, WireValue::F64(v)) => Value::Double(*v),
            (Self::Compatible { kind: FieldKind::String }, WireValue::String(v)) => Value::String(v.clone()),
            (Self::Integer { target: IntegerTarget::Signed(width), .. }, WireValue::I64(v)) => {
                Value::Int(narrow_signed(*v, *width))
            },
            (Self::Integer { target: IntegerTarget::Signed(width), .. }, WireValue::I32(v)) => {
                Value::Int(narrow_signed(i64::from(*v), *width))
            },
            (Self::Integer { target: IntegerTarget::Unsigned(width), .. }, WireValue::U64(v)) => {
                Value::UInt(narrow_unsigned(*v, *width))
            },
            (Self::Integer { target: IntegerTarget::Unsigned(width), .. }, WireValue::U32(v)) => {
                Value::UInt(narrow_unsigned(u64::from(*v), *width))
            },
            (Self::Integer { target: IntegerTarget::Timestamp, .. }, WireValue::U32(v)) => Value::Timestamp(*v),
            (Self::Bytes, WireValue::Bytes(v)) => Value::Bytes(v.clone()),
            (Self::Date, WireValue::String(v)) => Value::Date(
                NaiveDate::parse_from_str(v, DATE_FORMAT).map_err(|e| invalid(format!("{v:?}: {e}")))?,
            ),
            (Self::DateTime, WireValue::String(v)) => Value::DateTime(
                NaiveDateTime::parse_from_str(v, DATETIME_FORMAT)
                    .map_err(|e| invalid(format!("{v:?}: {e}")))?,
            ),
            (Self::Time, WireValue::I32(v)) => Value::Time(unpack_time(*v).map_err(invalid)?),
            (Self::Year, WireValue::I32(v)) => {
                let year = i64::from(*v) + i64::from(YEAR_OFFSET);
                Value::Year(u16::try_from(year).map_err(|_| invalid(format!("year {year}")))?)
            },
            (Self::DecimalAsLong { scale, .. }, WireValue::I64(v)) => Value::Decimal(
                Decimal::try_new(*v, u32::from(*scale)).map_err(|e| invalid(e.to_string()))?,
            ),
            (Self::DecimalAsBytes { precision, scale }, WireValue::Bytes(v)) => Value::Decimal(
                decimal::from_packed(v, *precision, *scale).map_err(|e| invalid(e.to_string()))?,
            ),
            (_, wire) => {
                return Err(ConversionError::WireKindMismatch {
                    column: column.to_string(),
                    expected: self.field_kind(),
                    found: wire.kind_name(),
                });
            },
        };
        Ok(value)
    }

    fn describe(&self) -> String {
        match self {
            Self::Compatible { kind } => kind.to_string(),
            Self::Integer { target: IntegerTarget::Signed(w), .. } => format!("signed {}-bit integer", w.bits()),
            Self::Integer { target: IntegerTarget::Unsigned(w), .. } => {
                format!("unsigned {}-bit integer", w.bits())
            },
            Self::Integer { target: IntegerTarget::Timestamp, .. } => ColumnType::Timestamp.to_string(),
            Self::Bytes => "bytes".to_string(),
            Self::Date => ColumnType::Date.to_string(),
            Self::DateTime => ColumnType::DateTime.to_string(),
            Self::Time => ColumnType::Time.to_string(),
            Self::Year => ColumnType::Year.to_string(),
            Self::DecimalAsLong { precision, scale } | Self::DecimalAsBytes { precision, scale } => {
                format!("DECIMAL({precision},{scale})")
            },
        }
    }
}

/// Two's-complement truncation of `v` to `width` bits, sign-extended.
pub fn narrow_signed(v: i64, width: IntWidth) -> i64 {
    let shift = 64 - width.bits();
    (v << shift) >> shift
}

/// Truncation of `v` to `width` bits.
pub fn narrow_unsigned(v: u64, width: IntWidth) -> u64 {
    match width {
        IntWidth::W64 => v,
        _ => v & ((1u64 << width.bits()) - 1),
    }
}

/// Packs signed seconds as `±(h*10000 + m*100 + s)`.
fn pack_time(column: &str, seconds: i32) -> Result<i32, ConversionError> {
    let total = i64::from(seconds.unsigned_abs());
    let packed = (total / 3600) * 10_000 + ((total / 60) % 60) * 100 + total % 60;
    let packed = if seconds < 0 { -packed } else { packed };
    i32::try_from(packed).map_err(|_| ConversionError::ValueOutOfRange {
        column: column.to_string(),
        reason: format!("TIME of {seconds} seconds exceeds the packed range"),
    })
}

fn unpack_time(packed: i32) -> Result<i32, String> {
    let magnitude = i64::from(packed.unsigned_abs());
    let (hours, minutes, seconds) = (magnitude / 10_000, (magnitude / 100) % 100, magnitude % 100);
    if minutes >= 60 || seconds >= 60 {
        return Err(format!("packed TIME {packed} has minutes {minutes} and seconds {seconds}"));
    }
    let total = hours * 3600 + minutes * 60 + seconds;
    let total = if packed < 0 { -total } else { total };
    i32::try_from(total).map_err(|_| format!("packed TIME {packed} exceeds the seconds range"))
}

fn decimal_to_long(column: &str, value: &Decimal, precision: u8, scale: u8) -> Result<i64, ConversionError> {
    let overflow = || ConversionError::DecimalOverflow {
        column: column.to_string(),
        value: value.to_string(),
        precision,
        scale,
    };
    let mut scaled = value.round_dp_with_strategy(u32::from(scale), rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    scaled.rescale(u32::from(scale));
    if scaled.scale() != u32::from(scale) {
        return Err(overflow());
    }
    let mantissa = scaled.mantissa();
    if mantissa.unsigned_abs() >= 10u128.pow(u32::from(precision)) {
        return Err(overflow());
    }
    i64::try_from(mantissa).map_err(|_| overflow())
}

fn packed_error(column: &str, precision: u8, scale: u8, err: PackedDecimalError) -> ConversionError {
    match err {
        PackedDecimalError::Overflow { value, .. } => {
            ConversionError::DecimalOverflow { column: column.to_string(), value, precision, scale }
        },
        other => ConversionError::InvalidWireValue { column: column.to_string(), reason: other.to_string() },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::*;

    fn roundtrip(column_type: ColumnType, value: Value) -> Value {
        let conversion = ColumnConversion::for_type(column_type);
        let wire = conversion.encode("c", &value).unwrap();
        conversion.decode("c", &wire).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_type_mapping() {
        let kind = |t: ColumnType| ColumnConversion::for_type(t).field_kind();
        assert_eq!(kind(ColumnType::Boolean), FieldKind::Bool);
        assert_eq!(kind(ColumnType::int(IntWidth::W8)), FieldKind::Sint32);
        assert_eq!(kind(ColumnType::uint(IntWidth::W24)), FieldKind::Uint32);
        assert_eq!(kind(ColumnType::int(IntWidth::W64)), FieldKind::Sint64);
        assert_eq!(kind(ColumnType::uint(IntWidth::W64)), FieldKind::Uint64);
        assert_eq!(kind(ColumnType::Timestamp), FieldKind::Uint32);
        assert_eq!(kind(ColumnType::Text), FieldKind::String);
        assert_eq!(kind(ColumnType::Blob), FieldKind::Bytes);
        assert_eq!(kind(ColumnType::Date), FieldKind::String);
        assert_eq!(kind(ColumnType::DateTime), FieldKind::String);
        assert_eq!(kind(ColumnType::Time), FieldKind::Sint32);
        assert_eq!(kind(ColumnType::Year), FieldKind::Sint32);
    }

    #[test]
    fn test_decimal_strategy_boundary() {
        let at = |p| ColumnConversion::for_type(ColumnType::decimal(p, 4).unwrap());
        assert_eq!(at(18), ColumnConversion::DecimalAsLong { precision: 18, scale: 4 });
        assert_eq!(at(18).field_kind(), FieldKind::Sint64);
        assert_eq!(at(19), ColumnConversion::DecimalAsBytes { precision: 19, scale: 4 });
        assert_eq!(at(19).field_kind(), FieldKind::Bytes);
        assert_eq!(at(19).decimal_scale(), Some(4));
    }

    #[test]
    fn test_decimal_boundary_values_roundtrip() {
        for (precision, text) in [
            (18, "99999999999999.9999"),
            (18, "-99999999999999.9999"),
            (18, "0.0000"),
            (19, "999999999999999.9999"),
            (19, "-999999999999999.9999"),
            (19, "0.0000"),
        ] {
            let column_type = ColumnType::decimal(precision, 4).unwrap();
            let value = Value::Decimal(dec(text));
            assert_eq!(roundtrip(column_type, value.clone()), value, "DECIMAL({precision},4) {text}");
        }
    }

    #[test]
    fn test_decimal_as_long_wire_is_unscaled() {
        let conversion = ColumnConversion::for_type(ColumnType::decimal(10, 2).unwrap());
        assert_eq!(conversion.encode("c", &Value::Decimal(dec("12.5"))).unwrap(), WireValue::I64(1250));
        assert_eq!(conversion.decode("c", &WireValue::I64(-1)).unwrap(), Value::Decimal(dec("-0.01")));
    }

    #[test]
    fn test_decimal_overflow() {
        let conversion = ColumnConversion::for_type(ColumnType::decimal(4, 2).unwrap());
        let err = conversion.encode("price", &Value::Decimal(dec("100.00"))).unwrap_err();
        assert!(matches!(err, ConversionError::DecimalOverflow { ref column, .. } if column == "price"));

        let wide = ColumnConversion::for_type(ColumnType::decimal(20, 2).unwrap());
        let err = wide.encode("price", &Value::Decimal(dec("1000000000000000000.00"))).unwrap_err();
        assert!(matches!(err, ConversionError::DecimalOverflow { .. }));
    }

    #[test]
    fn test_integer_narrowing() {
        let tiny = ColumnConversion::for_type(ColumnType::int(IntWidth::W8));
        assert_eq!(tiny.decode("c", &WireValue::I32(0x1_80)).unwrap(), Value::Int(-128));
        let medium = ColumnConversion::for_type(ColumnType::int(IntWidth::W24));
        assert_eq!(medium.decode("c", &WireValue::I32(0x80_0000)).unwrap(), Value::Int(-8_388_608));
        let umedium = ColumnConversion::for_type(ColumnType::uint(IntWidth::W24));
        assert_eq!(umedium.decode("c", &WireValue::U32(0x1FF_FFFF)).unwrap(), Value::UInt(0xFF_FFFF));
        assert_eq!(umedium.encode("c", &Value::UInt(16)).unwrap(), WireValue::U32(16));
    }

    #[test]
    fn test_integer_extremes_roundtrip() {
        for (width, min, max) in [
            (IntWidth::W8, i64::from(i8::MIN), i64::from(i8::MAX)),
            (IntWidth::W16, i64::from(i16::MIN), i64::from(i16::MAX)),
            (IntWidth::W24, -(1 << 23), (1 << 23) - 1),
            (IntWidth::W32, i64::from(i32::MIN), i64::from(i32::MAX)),
            (IntWidth::W64, i64::MIN, i64::MAX),
        ] {
            for v in [min, -1, 0, 1, max] {
                assert_eq!(roundtrip(ColumnType::int(width), Value::Int(v)), Value::Int(v));
            }
        }
        assert_eq!(roundtrip(ColumnType::uint(IntWidth::W64), Value::UInt(u64::MAX)), Value::UInt(u64::MAX));
        assert_eq!(roundtrip(ColumnType::uint(IntWidth::W32), Value::UInt(u64::from(u32::MAX))), Value::UInt(u64::from(u32::MAX)));
    }

    #[test]
    fn test_time_packing() {
        let time = ColumnConversion::for_type(ColumnType::Time);
        // 12:34:56
        assert_eq!(time.encode("c", &Value::Time(45_296)).unwrap(), WireValue::I32(123_456));
        assert_eq!(time.encode("c", &Value::Time(-45_296)).unwrap(), WireValue::I32(-123_456));
        assert_eq!(time.decode("c", &WireValue::I32(-8_385_959)).unwrap(), Value::Time(-(838 * 3600 + 59 * 60 + 59)));
        assert!(matches!(time.decode("c", &WireValue::I32(1_260)), Err(ConversionError::InvalidWireValue { .. })));
        assert!(matches!(time.encode("c", &Value::Time(i32::MAX)), Err(ConversionError::ValueOutOfRange { .. })));
    }

    #[test]
    fn test_year_offset() {
        let year = ColumnConversion::for_type(ColumnType::Year);
        assert_eq!(year.encode("c", &Value::Year(2024)).unwrap(), WireValue::I32(124));
        assert_eq!(year.decode("c", &WireValue::I32(-1)).unwrap(), Value::Year(1899));
        assert!(year.decode("c", &WireValue::I32(-5000)).is_err());
    }

    #[test]
    fn test_temporal_strings() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 9).unwrap();
        let conversion = ColumnConversion::for_type(ColumnType::Date);
        assert_eq!(conversion.encode("c", &Value::Date(date)).unwrap(), WireValue::String("2023-01-09".to_string()));

        let at = date.and_hms_opt(23, 5, 0).unwrap();
        let conversion = ColumnConversion::for_type(ColumnType::DateTime);
        assert_eq!(
            conversion.encode("c", &Value::DateTime(at)).unwrap(),
            WireValue::String("2023-01-09 23:05:00".to_string())
        );
        assert!(conversion.decode("c", &WireValue::String("yesterday".to_string())).is_err());
    }

    #[test]
    fn test_datetime_fraction_rejected() {
        let conversion = ColumnConversion::for_type(ColumnType::DateTime);
        let at = NaiveDateTime::parse_from_str("2024-01-02 03:04:05.678", "%Y-%m-%d %H:%M:%S%.f").unwrap();
        let err = conversion.encode("at", &Value::DateTime(at)).unwrap_err();
        assert!(matches!(err, ConversionError::ValueOutOfRange { ref column, .. } if column == "at"));

        let whole = at.with_nanosecond(0).unwrap();
        let wire = conversion.encode("at", &Value::DateTime(whole)).unwrap();
        assert_eq!(wire, WireValue::String("2024-01-02 03:04:05".to_string()));
        assert_eq!(conversion.decode("at", &wire).unwrap(), Value::DateTime(whole));
    }

    #[test]
    fn test_mismatches() {
        let conversion = ColumnConversion::for_type(ColumnType::int(IntWidth::W32));
        let err = conversion.encode("qty", &Value::UInt(1)).unwrap_err();
        assert!(matches!(err, ConversionError::ValueMismatch { found: "uint", .. }));
        let err = conversion.decode("qty", &WireValue::String("1".to_string())).unwrap_err();
        assert!(matches!(err, ConversionError::WireKindMismatch { expected: FieldKind::Sint32, .. }));
    }

    #[test]
    fn test_compatible_scalars_roundtrip() {
        assert_eq!(roundtrip(ColumnType::Boolean, Value::Bool(true)), Value::Bool(true));
        assert_eq!(roundtrip(ColumnType::Float, Value::Float(1.5)), Value::Float(1.5));
        assert_eq!(roundtrip(ColumnType::Double, Value::Double(-2.25)), Value::Double(-2.25));
        assert_eq!(roundtrip(ColumnType::Char { length: 3 }, Value::from("abc")), Value::from("abc"));
        assert_eq!(roundtrip(ColumnType::Varbinary { length: 3 }, Value::Bytes(vec![9])), Value::Bytes(vec![9]));
        assert_eq!(roundtrip(ColumnType::Timestamp, Value::Timestamp(u32::MAX)), Value::Timestamp(u32::MAX));
    }

    proptest! {
        #[test]
        fn prop_time_roundtrip(seconds in -(838 * 3600 + 59 * 60 + 59)..=(838 * 3600 + 59 * 60 + 59)) {
            prop_assert_eq!(roundtrip(ColumnType::Time, Value::Time(seconds)), Value::Time(seconds));
        }

        #[test]
        fn prop_year_roundtrip(year in 0u16..=u16::MAX) {
            prop_assert_eq!(roundtrip(ColumnType::Year, Value::Year(year)), Value::Year(year));
        }

        #[test]
        fn prop_medium_int_roundtrip(v in -(1i64 << 23)..(1i64 << 23)) {
            prop_assert_eq!(roundtrip(ColumnType::int(IntWidth::W24), Value::Int(v)), Value::Int(v));
        }

        #[test]
        fn prop_decimal_as_long_roundtrip(mantissa in -999_999_999_999_999_999i64..=999_999_999_999_999_999i64) {
            let value = Value::Decimal(Decimal::new(mantissa, 6));
            prop_assert_eq!(roundtrip(ColumnType::decimal(18, 6).unwrap(), value.clone()), value);
        }

        #[test]
        fn prop_datetime_roundtrip(seconds in 0i64..4_102_444_800) {
            let at = chrono::DateTime::from_timestamp(seconds, 0).unwrap().naive_utc();
            prop_assert_eq!(roundtrip(ColumnType::DateTime, Value::DateTime(at)), Value::DateTime(at));
        }
    }
}
