//! IEEE-11073 16-bit SFLOAT codec.
//!
//! Medical BLE profiles (glucose, blood pressure, thermometer) transmit
//! measurements as a 16-bit word holding a 12-bit two's-complement mantissa
//! in the low bits and a 4-bit two's-complement base-10 exponent in the high
//! bits: `value = mantissa × 10^exponent`.
//!
//! Five mantissa patterns are reserved for non-numeric states:
//!
//! | Mantissa | Meaning |
//! |----------|---------|
//! | `0x07FE` | +∞ |
//! | `0x07FF` | NaN |
//! | `0x0800` | NRes (not at this resolution) |
//! | `0x0801` | Reserved for future use |
//! | `0x0802` | −∞ |
//!
//! # Example
//!
//! ```
//! use vitalink_types::sfloat;
//!
//! let raw = sfloat::encode(4.2);
//! assert!((sfloat::decode(raw) - 4.2).abs() < 1e-3);
//! assert_eq!(sfloat::encode(f64::NAN), sfloat::NAN);
//! ```

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Encoded +∞.
pub const POSITIVE_INFINITY: u16 = 0x07FE;
/// Encoded NaN.
pub const NAN: u16 = 0x07FF;
/// Encoded "not at this resolution".
pub const NRES: u16 = 0x0800;
/// Encoded reserved value.
pub const RESERVED: u16 = 0x0801;
/// Encoded −∞.
pub const NEGATIVE_INFINITY: u16 = 0x0802;

/// Largest mantissa magnitude that is not a reserved pattern (2^11 − 3).
pub const MANTISSA_MAX: f64 = 2045.0;
/// Largest exponent representable in 4-bit two's complement.
pub const EXPONENT_MAX: i32 = 7;
/// Smallest exponent representable in 4-bit two's complement.
pub const EXPONENT_MIN: i32 = -8;
/// Largest finite magnitude: `MANTISSA_MAX × 10^EXPONENT_MAX`.
pub const MAX: f64 = 20_450_000_000.0;
/// Magnitudes below this encode as zero.
pub const EPSILON: f64 = 1e-8;
/// Decimal precision used when searching for the best mantissa.
const PRECISION: f64 = 10_000.0;

const MANTISSA_MASK: u16 = 0x0FFF;

/// Decoded meaning of an SFLOAT word.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SFloatValue {
    /// An ordinary number.
    Finite(f64),
    /// Positive infinity.
    PositiveInfinity,
    /// Not a number (the sensor reports an invalid result).
    NotANumber,
    /// The value cannot be represented at the available resolution.
    NotAtThisResolution,
    /// Reserved for future use.
    Reserved,
    /// Negative infinity.
    NegativeInfinity,
}

impl SFloatValue {
    /// Returns the numeric value, or `None` for any non-finite state.
    #[must_use]
    pub fn finite(self) -> Option<f64> {
        match self {
            SFloatValue::Finite(v) => Some(v),
            _ => None,
        }
    }

    /// Converts to `f64`, mapping the special states to IEEE-754 specials.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        match self {
            SFloatValue::Finite(v) => v,
            SFloatValue::PositiveInfinity => f64::INFINITY,
            SFloatValue::NegativeInfinity => f64::NEG_INFINITY,
            SFloatValue::NotANumber
            | SFloatValue::NotAtThisResolution
            | SFloatValue::Reserved => f64::NAN,
        }
    }
}

/// A raw SFLOAT word as received on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SFloat(u16);

impl SFloat {
    /// Wrap a raw 16-bit word.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Build from the two little-endian bytes used on the wire.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    /// Read an SFLOAT at `offset` in `buf`, if enough bytes remain.
    #[must_use]
    pub fn read(buf: &[u8], offset: usize) -> Option<Self> {
        let bytes = buf.get(offset..offset.checked_add(2)?)?;
        Some(Self::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Encode a floating-point value.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self(encode(value))
    }

    /// The raw 16-bit word.
    #[must_use]
    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// The little-endian wire representation.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Interpret the word, distinguishing reserved states from numbers.
    #[must_use]
    pub fn classify(self) -> SFloatValue {
        match self.0 & MANTISSA_MASK {
            POSITIVE_INFINITY => SFloatValue::PositiveInfinity,
            NAN => SFloatValue::NotANumber,
            NRES => SFloatValue::NotAtThisResolution,
            RESERVED => SFloatValue::Reserved,
            NEGATIVE_INFINITY => SFloatValue::NegativeInfinity,
            _ => SFloatValue::Finite(self.finite_value()),
        }
    }

    /// Decode to `f64`; reserved states become IEEE-754 specials.
    #[must_use]
    pub fn value(self) -> f64 {
        self.classify().to_f64()
    }

    fn finite_value(self) -> f64 {
        let mut mantissa = i32::from(self.0 & MANTISSA_MASK);
        if mantissa >= 0x0800 {
            mantissa -= 0x1000;
        }
        let mut exponent = i32::from(self.0 >> 12);
        if exponent >= 0x08 {
            exponent -= 0x10;
        }
        f64::from(mantissa) * 10f64.powi(exponent)
    }
}

impl From<u16> for SFloat {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

impl fmt::Display for SFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classify() {
            SFloatValue::Finite(v) => write!(f, "{}", v),
            SFloatValue::PositiveInfinity => write!(f, "+INF"),
            SFloatValue::NegativeInfinity => write!(f, "-INF"),
            SFloatValue::NotANumber => write!(f, "NaN"),
            SFloatValue::NotAtThisResolution => write!(f, "NRes"),
            SFloatValue::Reserved => write!(f, "Reserved"),
        }
    }
}

/// Decode a raw SFLOAT word to `f64`.
///
/// Reserved mantissa patterns decode to `+∞`, `−∞` or NaN.
#[must_use]
pub fn decode(raw: u16) -> f64 {
    SFloat::from_bits(raw).value()
}

/// Encode `value` into an SFLOAT word.
///
/// Picks the exponent that keeps the rounding error smallest at four
/// decimal places while the mantissa still fits in 11 bits plus sign.
/// NaN and out-of-range values map to the reserved sentinels; magnitudes
/// below [`EPSILON`] or needing an exponent under −8 encode as zero.
#[must_use]
pub fn encode(value: f64) -> u16 {
    if value.is_nan() {
        return NAN;
    }
    if value > MAX {
        return POSITIVE_INFINITY;
    }
    if value < -MAX {
        return NEGATIVE_INFINITY;
    }
    if value.abs() < EPSILON {
        return 0;
    }

    let negative = value < 0.0;
    let infinity = if negative {
        NEGATIVE_INFINITY
    } else {
        POSITIVE_INFINITY
    };

    let mut mantissa = value.abs();
    let mut exponent: i32 = 0;

    while mantissa > MANTISSA_MAX {
        mantissa /= 10.0;
        exponent += 1;
        if exponent > EXPONENT_MAX {
            return infinity;
        }
    }

    while mantissa < 1.0 {
        mantissa *= 10.0;
        exponent -= 1;
        if exponent < EXPONENT_MIN {
            return 0;
        }
    }

    let rounding_error =
        |m: f64| ((m * PRECISION).round() - m.round() * PRECISION).abs();
    while rounding_error(mantissa) > 0.5
        && exponent > EXPONENT_MIN
        && mantissa * 10.0 <= MANTISSA_MAX
    {
        mantissa *= 10.0;
        exponent -= 1;
    }

    let mut int_mantissa = mantissa.round() as i32;
    if negative {
        int_mantissa = -int_mantissa;
    }

    (((exponent as u16) & 0x0F) << 12) | ((int_mantissa as u16) & MANTISSA_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // --- encode/decode round trips ---

    #[test]
    fn test_exact_values_round_trip() {
        for value in [5.0, 0.0, -3.0, 120.0, 80.0, 1.0, -1.0, 2045.0] {
            assert_eq!(decode(encode(value)), value, "value {}", value);
        }
    }

    #[test]
    fn test_fractional_values_round_trip_within_tolerance() {
        for value in [4.2, 36.6, 0.25, -12.75, 98.6, 5.55] {
            let decoded = decode(encode(value));
            assert!(
                (decoded - value).abs() < 1e-3,
                "value {} decoded as {}",
                value,
                decoded
            );
        }
    }

    #[test]
    fn test_encode_known_words() {
        // 5 × 10^0
        assert_eq!(encode(5.0), 0x0005);
        // 42 × 10^-1
        assert_eq!(encode(4.2), 0xF02A);
        // -3 × 10^0
        assert_eq!(encode(-3.0), 0x0FFD);
        // 120 × 10^0
        assert_eq!(encode(120.0), 0x0078);
    }

    #[test]
    fn test_decode_known_words() {
        assert_eq!(decode(0x0078), 120.0);
        assert!((decode(0xF02A) - 4.2).abs() < 1e-9);
        assert_eq!(decode(0x0FFD), -3.0);
        // 1 × 10^2
        assert_eq!(decode(0x2001), 100.0);
    }

    // --- sentinels ---

    #[test]
    fn test_encode_sentinels() {
        assert_eq!(encode(f64::NAN), 0x07FF);
        assert_eq!(encode(30_000_000_000.0), 0x07FE);
        assert_eq!(encode(-30_000_000_000.0), 0x0802);
        assert_eq!(encode(1e-9), 0x0000);
        assert_eq!(encode(-1e-9), 0x0000);
        assert_eq!(encode(f64::INFINITY), POSITIVE_INFINITY);
        assert_eq!(encode(f64::NEG_INFINITY), NEGATIVE_INFINITY);
    }

    #[test]
    fn test_encode_minimum_exponent_loses_precision() {
        assert_eq!(encode(7.5e-9), 0x0000);
        // No headroom left below 10^-8, so 1.7 rounds to 2.
        assert_eq!(encode(1.7e-8), 0x8002);
    }

    #[test]
    fn test_decode_sentinels() {
        assert_eq!(decode(POSITIVE_INFINITY), f64::INFINITY);
        assert_eq!(decode(NEGATIVE_INFINITY), f64::NEG_INFINITY);
        assert!(decode(NAN).is_nan());
        assert!(decode(NRES).is_nan());
        assert!(decode(RESERVED).is_nan());
    }

    #[test]
    fn test_classify_sentinels() {
        assert_eq!(
            SFloat::from_bits(POSITIVE_INFINITY).classify(),
            SFloatValue::PositiveInfinity
        );
        assert_eq!(SFloat::from_bits(NAN).classify(), SFloatValue::NotANumber);
        assert_eq!(
            SFloat::from_bits(NRES).classify(),
            SFloatValue::NotAtThisResolution
        );
        assert_eq!(SFloat::from_bits(RESERVED).classify(), SFloatValue::Reserved);
        assert_eq!(
            SFloat::from_bits(NEGATIVE_INFINITY).classify(),
            SFloatValue::NegativeInfinity
        );
        assert_eq!(SFloat::from_bits(0x0078).classify(), SFloatValue::Finite(120.0));
        assert_eq!(SFloat::from_bits(NAN).classify().finite(), None);
    }

    #[test]
    fn test_read_from_buffer() {
        let buf = [0xAA, 0x78, 0x00, 0x50];
        assert_eq!(SFloat::read(&buf, 1).map(SFloat::value), Some(120.0));
        assert_eq!(SFloat::read(&buf, 3), None);
        assert_eq!(SFloat::read(&buf, usize::MAX), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SFloat::from_bits(0x0078).to_string(), "120");
        assert_eq!(SFloat::from_bits(NAN).to_string(), "NaN");
        assert_eq!(SFloat::from_bits(NEGATIVE_INFINITY).to_string(), "-INF");
    }

    proptest! {
        #[test]
        fn prop_round_trip_relative_error(value in 0.001f64..1.0e9, negative in any::<bool>()) {
            let value = if negative { -value } else { value };
            let decoded = decode(encode(value));
            // Mantissa is kept above 204.5 whenever precision is lost.
            prop_assert!(((decoded - value) / value).abs() < 0.003);
        }

        #[test]
        fn prop_decode_never_panics(raw in any::<u16>()) {
            let _ = decode(raw);
        }

        #[test]
        fn prop_sign_preserved(value in 0.01f64..1.0e6) {
            prop_assert!(decode(encode(value)) > 0.0);
            prop_assert!(decode(encode(-value)) < 0.0);
        }
    }
}
