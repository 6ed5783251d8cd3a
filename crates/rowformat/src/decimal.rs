//! Packed decimal byte layout.
//!
//! A DECIMAL(precision, scale) is stored as a fixed-length, big-endian byte
//! string whose bytes compare in numeric order:
//!
//! - The integer digits and the fraction digits are packed separately.
//!   Each full group of nine digits takes four bytes; a leftover group of
//!   one to eight digits takes one to four bytes ([`DIG_TO_BYTES`]).
//! - Integer digits put the leftover group first; fraction digits put it
//!   last.
//! - Negative values have every byte inverted.
//! - The high bit of the first byte is then flipped, so it is set for
//!   non-negative values and clear for negative ones.
//!
//! `123.45` as DECIMAL(5,2) packs to `[0x80, 0x7B, 0x2D]`.

use rust_decimal::{Decimal, RoundingStrategy};
use snafu::{Snafu, ensure};

const DIGITS_PER_WORD: u32 = 9;
const WORD_BYTES: usize = 4;
const WORD_MAX: u128 = 1_000_000_000;

/// Bytes used by a group of `n` leftover digits.
pub const DIG_TO_BYTES: [usize; 10] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];

/// Errors raised while packing or unpacking decimals.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum PackedDecimalError {
    /// The value has more integer digits than the declared precision allows,
    /// or cannot be rescaled to the declared scale.
    #[snafu(display("{value} does not fit DECIMAL({precision},{scale})"))]
    Overflow {
        /// The rejected value.
        value: String,
        /// Declared precision.
        precision: u8,
        /// Declared scale.
        scale: u8,
    },

    /// The byte string has the wrong length for the declared precision and scale.
    #[snafu(display("Packed decimal has {found} bytes, expected {expected}"))]
    Length {
        /// Length the declaration implies.
        expected: usize,
        /// Length supplied.
        found: usize,
    },

    /// A digit group holds more digits than its width allows.
    #[snafu(display("Packed decimal group {group} is out of range"))]
    Digits {
        /// The offending group value.
        group: u32,
    },
}

/// Length in bytes of a packed DECIMAL(precision, scale).
pub fn packed_len(precision: u8, scale: u8) -> usize {
    let int_digits = usize::from(precision.saturating_sub(scale));
    let frac_digits = usize::from(scale);
    part_len(int_digits) + part_len(frac_digits)
}

fn part_len(digits: usize) -> usize {
    (digits / DIGITS_PER_WORD as usize) * WORD_BYTES + DIG_TO_BYTES[digits % DIGITS_PER_WORD as usize]
}

fn pow10(exp: u32) -> u128 {
    10u128.pow(exp)
}

/// Packs `value` as DECIMAL(precision, scale).
///
/// Values with more fraction digits than `scale` are rounded half away
/// from zero.
///
/// # Errors
///
/// Returns [`PackedDecimalError::Overflow`] if the integer part needs more
/// than `precision - scale` digits.
pub fn to_packed(value: &Decimal, precision: u8, scale: u8) -> Result<Vec<u8>, PackedDecimalError> {
    let overflow = || PackedDecimalError::Overflow { value: value.to_string(), precision, scale };

    let mut scaled = value.round_dp_with_strategy(u32::from(scale), RoundingStrategy::MidpointAwayFromZero);
    scaled.rescale(u32::from(scale));
    ensure!(scaled.scale() == u32::from(scale), OverflowSnafu { value: value.to_string(), precision, scale });

    let mantissa = scaled.mantissa();
    let negative = mantissa < 0;
    let magnitude = mantissa.unsigned_abs();
    let int_digits = u32::from(precision.saturating_sub(scale));
    let frac_digits = u32::from(scale);
    let int_part = magnitude / pow10(frac_digits);
    let frac_part = magnitude % pow10(frac_digits);
    if int_part >= pow10(int_digits) {
        return Err(overflow());
    }

    let mut out = Vec::with_capacity(packed_len(precision, scale));

    let int_full = int_digits / DIGITS_PER_WORD;
    let int_lead = int_digits % DIGITS_PER_WORD;
    push_group(&mut out, int_part / pow10(DIGITS_PER_WORD * int_full), DIG_TO_BYTES[int_lead as usize]);
    for i in (0..int_full).rev() {
        push_group(&mut out, (int_part / pow10(DIGITS_PER_WORD * i)) % WORD_MAX, WORD_BYTES);
    }

    let frac_full = frac_digits / DIGITS_PER_WORD;
    let frac_tail = frac_digits % DIGITS_PER_WORD;
    for i in 0..frac_full {
        let shift = frac_digits - DIGITS_PER_WORD * (i + 1);
        push_group(&mut out, (frac_part / pow10(shift)) % WORD_MAX, WORD_BYTES);
    }
    push_group(&mut out, frac_part % pow10(frac_tail), DIG_TO_BYTES[frac_tail as usize]);

    if negative {
        for byte in &mut out {
            *byte = !*byte;
        }
    }
    if let Some(first) = out.first_mut() {
        *first ^= 0x80;
    }
    Ok(out)
}

/// Unpacks a DECIMAL(precision, scale) produced by [`to_packed`].
///
/// # Errors
///
/// Returns [`PackedDecimalError::Length`] if `bytes` has the wrong length and
/// [`PackedDecimalError::Digits`] if a digit group is out of range.
pub fn from_packed(bytes: &[u8], precision: u8, scale: u8) -> Result<Decimal, PackedDecimalError> {
    let expected = packed_len(precision, scale);
    ensure!(bytes.len() == expected && expected > 0, LengthSnafu { expected, found: bytes.len() });

    let mut buf = bytes.to_vec();
    let negative = buf[0] & 0x80 == 0;
    buf[0] ^= 0x80;
    if negative {
        for byte in &mut buf {
            *byte = !*byte;
        }
    }

    let int_digits = u32::from(precision.saturating_sub(scale));
    let frac_digits = u32::from(scale);
    let mut cursor = buf.as_slice();

    let int_lead = int_digits % DIGITS_PER_WORD;
    let mut int_part = take_group(&mut cursor, int_lead)?;
    for _ in 0..int_digits / DIGITS_PER_WORD {
        int_part = int_part * WORD_MAX + take_group(&mut cursor, DIGITS_PER_WORD)?;
    }

    let mut frac_part = 0u128;
    for _ in 0..frac_digits / DIGITS_PER_WORD {
        frac_part = frac_part * WORD_MAX + take_group(&mut cursor, DIGITS_PER_WORD)?;
    }
    let frac_tail = frac_digits % DIGITS_PER_WORD;
    frac_part = frac_part * pow10(frac_tail) + take_group(&mut cursor, frac_tail)?;

    let magnitude = int_part * pow10(frac_digits) + frac_part;
    let overflow = || PackedDecimalError::Overflow { value: magnitude.to_string(), precision, scale };
    let magnitude = i128::try_from(magnitude).map_err(|_| overflow())?;
    let mantissa = if negative { -magnitude } else { magnitude };
    Decimal::try_from_i128_with_scale(mantissa, u32::from(scale)).map_err(|_| overflow())
}

fn push_group(out: &mut Vec<u8>, group: u128, width: usize) {
    // groups never exceed 10^9, so the low four bytes hold them
    let bytes = (group as u32).to_be_bytes();
    out.extend_from_slice(&bytes[WORD_BYTES - width..]);
}

fn take_group(cursor: &mut &[u8], digits: u32) -> Result<u128, PackedDecimalError> {
    let width = DIG_TO_BYTES[digits as usize];
    let (head, rest) = cursor.split_at(width);
    *cursor = rest;
    let mut word = [0u8; WORD_BYTES];
    word[WORD_BYTES - width..].copy_from_slice(head);
    let group = u32::from_be_bytes(word);
    ensure!(u128::from(group) < pow10(digits), DigitsSnafu { group });
    Ok(u128::from(group))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_known_layout() {
        assert_eq!(to_packed(&dec("123.45"), 5, 2).unwrap(), vec![0x80, 0x7B, 0x2D]);
        assert_eq!(to_packed(&dec("-123.45"), 5, 2).unwrap(), vec![0x7F, 0x84, 0xD2]);
        assert_eq!(to_packed(&dec("0"), 5, 2).unwrap(), vec![0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_lengths() {
        assert_eq!(packed_len(5, 2), 3);
        assert_eq!(packed_len(9, 0), 4);
        assert_eq!(packed_len(10, 0), 5);
        assert_eq!(packed_len(19, 4), 4 + 3 + 2);
        assert_eq!(packed_len(28, 10), 4 + 4 + 4 + 1);
    }

    #[test]
    fn test_wide_roundtrip() {
        for s in ["1234567890123456789.1234", "-9999999999999999999.9999", "0.0001", "-0.0001"] {
            let packed = to_packed(&dec(s), 23, 4).unwrap();
            assert_eq!(packed.len(), packed_len(23, 4));
            assert_eq!(from_packed(&packed, 23, 4).unwrap(), dec(s), "{s}");
        }
    }

    #[test]
    fn test_rounds_extra_fraction_digits() {
        let packed = to_packed(&dec("1.005"), 4, 2).unwrap();
        assert_eq!(from_packed(&packed, 4, 2).unwrap(), dec("1.01"));
    }

    #[test]
    fn test_overflow() {
        let err = to_packed(&dec("1000.00"), 5, 2).unwrap_err();
        assert!(matches!(err, PackedDecimalError::Overflow { .. }));
    }

    #[test]
    fn test_bad_length_and_digits() {
        assert!(matches!(from_packed(&[0x80, 0x00], 5, 2), Err(PackedDecimalError::Length { .. })));
        // leading group of three digits holding 0xFFFF
        assert!(matches!(
            from_packed(&[0xFF, 0xFF, 0x00], 5, 2),
            Err(PackedDecimalError::Digits { .. })
        ));
    }

    #[test]
    fn test_byte_order_matches_numeric_order() {
        let values = ["-500.25", "-1.00", "0.00", "0.01", "3.50", "999.99"];
        let packed: Vec<_> = values.iter().map(|v| to_packed(&dec(v), 5, 2).unwrap()).collect();
        let mut sorted = packed.clone();
        sorted.sort();
        assert_eq!(packed, sorted);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_at_declared_scale(mantissa in -(10i64.pow(17))..10i64.pow(17), scale in 0u32..=6) {
            let value = Decimal::new(mantissa, scale);
            let precision = 18u8;
            let scale = scale as u8;
            let packed = to_packed(&value, precision, scale).unwrap();
            prop_assert_eq!(from_packed(&packed, precision, scale).unwrap(), value);
        }
    }
}
