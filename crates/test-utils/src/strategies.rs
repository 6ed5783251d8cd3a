//! Proptest strategies for Tessera values and rows.
//!
//! Generators produce values that are representable in their column type,
//! so round-trip properties hold for every generated case.
//!
//! # Usage
//!
//! ```no_run
//! use proptest::prelude::*;
//! use tessera_test_utils::{fixtures, strategies};
//!
//! proptest! {
//!     #[test]
//!     fn my_property(row in strategies::arb_row(&fixtures::all_types_table())) {
//!         // test invariant with a randomly generated row
//!     }
//! }
//! ```

use chrono::{DateTime, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tessera_types::{ColumnType, IntWidth, Row, Table, Value};

/// Largest magnitude of a TIME value in seconds (`838:59:59`).
pub const MAX_TIME_SECONDS: i32 = 838 * 3600 + 59 * 60 + 59;

/// Generates a signed integer that fits `width`.
pub fn arb_signed(width: IntWidth) -> BoxedStrategy<i64> {
    match width {
        IntWidth::W64 => any::<i64>().boxed(),
        _ => {
            let bound = 1i64 << (width.bits() - 1);
            (-bound..bound).boxed()
        },
    }
}

/// Generates an unsigned integer that fits `width`.
pub fn arb_unsigned(width: IntWidth) -> BoxedStrategy<u64> {
    match width {
        IntWidth::W64 => any::<u64>().boxed(),
        _ => (0..(1u64 << width.bits())).boxed(),
    }
}

/// Generates a decimal with exactly `scale` fraction digits that fits
/// DECIMAL(precision, scale).
pub fn arb_decimal(precision: u8, scale: u8) -> BoxedStrategy<Decimal> {
    let limit = 10i128.pow(u32::from(precision));
    (-limit + 1..limit)
        .prop_map(move |mantissa| {
            Decimal::try_from_i128_with_scale(mantissa, u32::from(scale)).unwrap_or(Decimal::ZERO)
        })
        .boxed()
}

/// Generates a date between years 1000 and 9999.
pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1000i32..=9999, 1u32..=365).prop_filter_map("valid ordinal", |(y, d)| NaiveDate::from_yo_opt(y, d))
}

/// Generates a non-NULL value of `column_type`.
pub fn arb_value(column_type: ColumnType) -> BoxedStrategy<Value> {
    match column_type {
        ColumnType::Boolean => any::<bool>().prop_map(Value::Bool).boxed(),
        ColumnType::Integer { width, unsigned: false } => arb_signed(width).prop_map(Value::Int).boxed(),
        ColumnType::Integer { width, unsigned: true } => arb_unsigned(width).prop_map(Value::UInt).boxed(),
        ColumnType::Float => any::<f32>()
            .prop_filter("not NaN", |v| !v.is_nan())
            .prop_map(Value::Float)
            .boxed(),
        ColumnType::Double => any::<f64>()
            .prop_filter("not NaN", |v| !v.is_nan())
            .prop_map(Value::Double)
            .boxed(),
        ColumnType::Decimal { precision, scale } => arb_decimal(precision, scale).prop_map(Value::Decimal).boxed(),
        ColumnType::Char { .. } | ColumnType::Varchar { .. } | ColumnType::Text => {
            ".{0,32}".prop_map(Value::String).boxed()
        },
        ColumnType::Binary { .. } | ColumnType::Varbinary { .. } | ColumnType::Blob => {
            proptest::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes).boxed()
        },
        ColumnType::Date => arb_date().prop_map(Value::Date).boxed(),
        ColumnType::DateTime => (-30_610_224_000i64..253_402_300_799)
            .prop_filter_map("in range", |secs| DateTime::from_timestamp(secs, 0))
            .prop_map(|dt| Value::DateTime(dt.naive_utc()))
            .boxed(),
        ColumnType::Time => (-MAX_TIME_SECONDS..=MAX_TIME_SECONDS).prop_map(Value::Time).boxed(),
        ColumnType::Year => (1901u16..=2155).prop_map(Value::Year).boxed(),
        ColumnType::Timestamp => any::<u32>().prop_map(Value::Timestamp).boxed(),
    }
}

/// Generates a value of `column_type` that is NULL about a quarter of the
/// time when `nullable` is set.
pub fn arb_nullable_value(column_type: ColumnType, nullable: bool) -> BoxedStrategy<Value> {
    if nullable {
        prop_oneof![1 => Just(Value::Null), 3 => arb_value(column_type)].boxed()
    } else {
        arb_value(column_type)
    }
}

/// Generates a row of `table`, honoring column nullability.
pub fn arb_row(table: &Table) -> BoxedStrategy<Row> {
    let table_id = table.id;
    let values: Vec<_> = table.columns.iter().map(|c| arb_nullable_value(c.column_type, c.nullable)).collect();
    values.prop_map(move |values| Row::new(table_id, values)).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    proptest! {
        #[test]
        fn prop_generated_values_fit_their_column(row in arb_row(&fixtures::all_types_table())) {
            let table = fixtures::all_types_table();
            for (column, value) in table.columns.iter().zip(&row.values) {
                prop_assert!(value.is_null() || column.column_type.accepts(value), "{} {value}", column.column_type);
            }
        }

        #[test]
        fn prop_decimals_fit_precision(value in arb_decimal(10, 2)) {
            prop_assert!(value.abs() < Decimal::new(100_000_000, 0));
            prop_assert_eq!(value.scale(), 2);
        }
    }
}
