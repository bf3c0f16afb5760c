//! Deterministic fixed-point number used by every numeric path in the core.
//!
//! A `Fixed` is an `i64` holding `round(x * SCALE)`. Binary floating point is
//! never involved: multiplication and division promote to `i128`, rescale by
//! one `SCALE` factor and round half away from zero. Every operation is
//! checked; overflow and division by zero surface as [`FixedPointError`]
//! instead of wrapping or saturating.

use core::cmp::Ordering;
use core::fmt::{self, Display, Formatter};
use core::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{FixedPointError, Result};

/// Number of decimal digits carried after the point.
pub const DECIMALS: u32 = 9;

/// Scaling factor: 1 unit = 1e-9.
pub const SCALE: i64 = 1_000_000_000;

/// Fractional bits produced by [`Fixed::log2`] before rescaling to `SCALE`.
const LOG2_FRACTION_BITS: u32 = 32;
/// Working precision of the mantissa while squaring in `log2_q32`.
const MANTISSA_BITS: u32 = 60;

/// Fixed-point 64-bit number with nine decimal places of precision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(i64);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(SCALE);

    /// Construct from a raw scaled integer (the wire format).
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Return the raw scaled integer value.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Whole number of units, e.g. `from_integer(3)` is 3.0.
    pub fn from_integer(value: i64) -> Result<Self> {
        value
            .checked_mul(SCALE)
            .map(Self)
            .ok_or(FixedPointError::Overflow { op: "from_integer" })
    }

    /// Exact ratio `numerator / denominator`, rounded to the nearest unit.
    pub fn from_ratio(numerator: i64, denominator: i64) -> Result<Self> {
        if denominator == 0 {
            return Err(FixedPointError::DivisionByZero { op: "from_ratio" });
        }
        let scaled = i128::from(numerator) * i128::from(SCALE);
        narrow(div_round(scaled, i128::from(denominator)), "from_ratio")
    }

    /// Integer part, truncated toward zero.
    #[inline]
    pub fn to_integer(self) -> i64 {
        self.0 / SCALE
    }

    /// True when the value has no fractional part.
    #[inline]
    pub fn is_integral(self) -> bool {
        self.0 % SCALE == 0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Result<Self> {
        self.0
            .checked_abs()
            .map(Self)
            .ok_or(FixedPointError::Overflow { op: "abs" })
    }

    pub fn try_neg(self) -> Result<Self> {
        self.0
            .checked_neg()
            .map(Self)
            .ok_or(FixedPointError::Overflow { op: "neg" })
    }

    pub fn try_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::Overflow { op: "add" })
    }

    pub fn try_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::Overflow { op: "sub" })
    }

    /// `self * rhs / SCALE`, computed in 128 bits before the rescale.
    pub fn try_mul(self, rhs: Self) -> Result<Self> {
        if self.0 == 0 || rhs.0 == 0 {
            return Ok(Self::ZERO);
        }
        let product = i128::from(self.0) * i128::from(rhs.0);
        narrow(div_round(product, i128::from(SCALE)), "mul")
    }

    /// `self * SCALE / rhs`; division by zero is an error, never a silent zero.
    pub fn try_div(self, rhs: Self) -> Result<Self> {
        if rhs.0 == 0 {
            return Err(FixedPointError::DivisionByZero { op: "div" });
        }
        let numerator = i128::from(self.0) * i128::from(SCALE);
        narrow(div_round(numerator, i128::from(rhs.0)), "div")
    }

    /// Multiply by a plain integer (no rescale).
    pub fn try_mul_int(self, rhs: i64) -> Result<Self> {
        self.0
            .checked_mul(rhs)
            .map(Self)
            .ok_or(FixedPointError::Overflow { op: "mul_int" })
    }

    /// Base-2 logarithm of a strictly positive value.
    ///
    /// Integer-only: the mantissa is normalised to `[1, 2)` and squared
    /// repeatedly to extract 32 fractional bits, so every node computes the
    /// same result. Accuracy is a few raw units.
    pub fn log2(self) -> Result<Self> {
        if self.0 <= 0 {
            return Err(FixedPointError::NonPositiveLogarithm { raw: self.0 });
        }
        let q32 = log2_q32(self.0 as u128) - log2_q32(SCALE as u128);
        let scaled = q32 * i128::from(SCALE);
        narrow(div_round(scaled, 1i128 << LOG2_FRACTION_BITS), "log2")
    }
}

/// `log2(value)` for an integer `value >= 1`, in Q32 fixed point.
fn log2_q32(value: u128) -> i128 {
    let int_part = 127 - value.leading_zeros();
    // Mantissa in [1, 2) with MANTISSA_BITS fractional bits.
    let mut mantissa = if int_part >= MANTISSA_BITS {
        value >> (int_part - MANTISSA_BITS)
    } else {
        value << (MANTISSA_BITS - int_part)
    };
    let two = 2u128 << MANTISSA_BITS;

    let mut fraction: i128 = 0;
    for bit in (0..LOG2_FRACTION_BITS).rev() {
        mantissa = (mantissa * mantissa) >> MANTISSA_BITS;
        if mantissa >= two {
            mantissa >>= 1;
            fraction |= 1 << bit;
        }
    }
    (i128::from(int_part) << LOG2_FRACTION_BITS) | fraction
}

/// Integer division rounding half away from zero.
///
/// `denominator` must be non-zero; callers check before dividing.
pub fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder == 0 {
        return quotient;
    }
    if remainder.unsigned_abs() * 2 >= denominator.unsigned_abs() {
        if (numerator < 0) == (denominator < 0) {
            quotient + 1
        } else {
            quotient - 1
        }
    } else {
        quotient
    }
}

pub(crate) fn narrow(value: i128, op: &'static str) -> Result<Fixed> {
    i64::try_from(value)
        .map(Fixed)
        .map_err(|_| FixedPointError::Overflow { op })
}

/// Convert an integer carrying `decimals` decimal places into a `Fixed`.
///
/// `to_fixed(15, 1)` is 1.5. Inputs with more than nine decimals are rounded
/// half away from zero.
pub fn to_fixed(raw: i64, decimals: u32) -> Result<Fixed> {
    match decimals.cmp(&DECIMALS) {
        Ordering::Equal => Ok(Fixed(raw)),
        Ordering::Less => {
            let factor = 10i64.pow(DECIMALS - decimals);
            raw.checked_mul(factor)
                .map(Fixed)
                .ok_or(FixedPointError::Overflow { op: "to_fixed" })
        }
        Ordering::Greater => {
            let shift = decimals - DECIMALS;
            let divisor = 10i128
                .checked_pow(shift)
                .ok_or(FixedPointError::Overflow { op: "to_fixed" })?;
            narrow(div_round(i128::from(raw), divisor), "to_fixed")
        }
    }
}

impl Display for Fixed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let scale = SCALE as u64;
        write!(
            f,
            "{sign}{}.{:09}",
            magnitude / scale,
            magnitude % scale
        )
    }
}

impl FromStr for Fixed {
    type Err = FixedPointError;

    /// Parse a decimal literal such as `"-0.25"` or `"12"` without floats.
    fn from_str(input: &str) -> Result<Self> {
        let parse_err = |reason| FixedPointError::Parse {
            input: input.to_string(),
            reason,
        };
        let trimmed = input.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (int_digits, frac_digits) = match body.split_once('.') {
            Some((i, fr)) => (i, fr),
            None => (body, ""),
        };
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(parse_err("no digits"));
        }
        if !int_digits.bytes().chain(frac_digits.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(parse_err("unexpected character"));
        }

        let mut digits: i128 = 0;
        for b in int_digits.bytes().chain(frac_digits.bytes()) {
            digits = digits
                .checked_mul(10)
                .and_then(|d| d.checked_add(i128::from(b - b'0')))
                .ok_or_else(|| parse_err("out of range"))?;
        }
        let frac_len = frac_digits.len() as u32;
        let raw = if frac_len <= DECIMALS {
            digits
                .checked_mul(10i128.pow(DECIMALS - frac_len))
                .ok_or_else(|| parse_err("out of range"))?
        } else {
            let divisor = 10i128
                .checked_pow(frac_len - DECIMALS)
                .ok_or_else(|| parse_err("too many decimals"))?;
            div_round(digits, divisor)
        };
        let signed = if negative { -raw } else { raw };
        i64::try_from(signed)
            .map(Fixed)
            .map_err(|_| parse_err("out of range"))
    }
}

impl Serialize for Fixed {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Fixed {
    /// Accepts the pre-scaled integer wire form or a decimal string.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FixedVisitor;

        impl<'de> Visitor<'de> for FixedVisitor {
            type Value = Fixed;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("a pre-scaled integer or a decimal string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Fixed, E> {
                Ok(Fixed(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Fixed, E> {
                i64::try_from(v)
                    .map(Fixed)
                    .map_err(|_| E::custom("fixed-point raw value out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Fixed, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(FixedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(s: &str) -> Fixed {
        s.parse().unwrap()
    }

    #[test]
    fn basic_operations() {
        let a = fx("1.5");
        let b = fx("2.25");

        assert_eq!(a.try_add(b).unwrap(), fx("3.75"));
        assert_eq!(b.try_sub(a).unwrap(), fx("0.75"));
        assert_eq!(a.try_mul(b).unwrap(), fx("3.375"));
        assert_eq!(b.try_div(a).unwrap(), fx("1.5"));
    }

    #[test]
    fn mul_rounds_half_away_from_zero() {
        // 0.000000001 * 0.5 = 0.0000000005 -> rounds to 1 raw unit
        let tiny = Fixed::from_raw(1);
        let half = fx("0.5");
        assert_eq!(tiny.try_mul(half).unwrap().raw(), 1);
        assert_eq!(tiny.try_neg().unwrap().try_mul(half).unwrap().raw(), -1);
    }

    #[test]
    fn overflow_is_an_error() {
        let big = Fixed::from_raw(i64::MAX);
        assert!(matches!(
            big.try_add(Fixed::ONE),
            Err(FixedPointError::Overflow { op: "add" })
        ));
        assert!(big.try_mul(fx("2")).is_err());
        assert!(Fixed::from_integer(i64::MAX / 10).is_err());
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(matches!(
            Fixed::ONE.try_div(Fixed::ZERO),
            Err(FixedPointError::DivisionByZero { .. })
        ));
        assert!(Fixed::from_ratio(1, 0).is_err());
    }

    #[test]
    fn display_keeps_sign_for_small_negatives() {
        assert_eq!(fx("-0.5").to_string(), "-0.500000000");
        assert_eq!(fx("12.345678").to_string(), "12.345678000");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("1.2.3".parse::<Fixed>().is_err());
        assert!("abc".parse::<Fixed>().is_err());
        assert!(".".parse::<Fixed>().is_err());
        assert_eq!(fx(".5"), fx("0.5"));
        assert_eq!(fx("0.0000000015").raw(), 2);
    }

    #[test]
    fn log2_of_powers_of_two() {
        assert_eq!(Fixed::ONE.log2().unwrap(), Fixed::ZERO);
        let three = fx("8").log2().unwrap();
        assert!((three.raw() - 3 * SCALE).abs() <= 4, "got {}", three);
        let minus_one = fx("0.5").log2().unwrap();
        assert!((minus_one.raw() + SCALE).abs() <= 4, "got {}", minus_one);
        assert!(Fixed::ZERO.log2().is_err());
    }

    #[test]
    fn log2_is_monotonic() {
        let a = fx("3").log2().unwrap();
        let b = fx("3.000001").log2().unwrap();
        assert!(b > a);
    }

    #[test]
    fn serde_accepts_raw_and_decimal() {
        let raw: Fixed = serde_json::from_str("1500000000").unwrap();
        let dec: Fixed = serde_json::from_str("\"1.5\"").unwrap();
        assert_eq!(raw, dec);
        assert_eq!(serde_json::to_string(&dec).unwrap(), "1500000000");
    }
}
