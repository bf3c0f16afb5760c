//! Vector helpers over [`Fixed`] values.
//!
//! Dot products and squared norms accumulate exact `i128` products at
//! `SCALE²` and round once at the end, so the result does not depend on the
//! order of summation beyond the final rescale.

use crate::errors::{FixedPointError, Result};
use crate::fixed::{div_round, narrow, Fixed, SCALE};

/// Exact running sum of fixed-point products.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accumulator {
    /// Sum scaled by `SCALE²`.
    wide: i128,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `a * b`.
    pub fn add_product(&mut self, a: Fixed, b: Fixed) -> Result<()> {
        let product = i128::from(a.raw()) * i128::from(b.raw());
        self.wide = self
            .wide
            .checked_add(product)
            .ok_or(FixedPointError::Overflow { op: "accumulate" })?;
        Ok(())
    }

    /// Add a plain value.
    pub fn add(&mut self, value: Fixed) -> Result<()> {
        let widened = i128::from(value.raw()) * i128::from(SCALE);
        self.wide = self
            .wide
            .checked_add(widened)
            .ok_or(FixedPointError::Overflow { op: "accumulate" })?;
        Ok(())
    }

    /// Rescale to a `Fixed`, rounding half away from zero.
    pub fn finish(self) -> Result<Fixed> {
        narrow(div_round(self.wide, i128::from(SCALE)), "accumulate")
    }
}

/// Dot product of two equally long dense vectors.
pub fn dot(left: &[Fixed], right: &[Fixed]) -> Result<Fixed> {
    if left.len() != right.len() {
        return Err(FixedPointError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    let mut acc = Accumulator::new();
    for (a, b) in left.iter().zip(right) {
        acc.add_product(*a, *b)?;
    }
    acc.finish()
}

/// `Σ vᵢ²`.
pub fn squared_norm(values: &[Fixed]) -> Result<Fixed> {
    let mut acc = Accumulator::new();
    for v in values {
        acc.add_product(*v, *v)?;
    }
    acc.finish()
}

/// Scale `values` to unit Euclidean length.
///
/// The zero vector has no direction and is returned unchanged.
pub fn normalize(values: &[Fixed]) -> Result<Vec<Fixed>> {
    let mut sum_sq: u128 = 0;
    let mut max_abs: u64 = 0;
    for v in values {
        let raw = v.raw().unsigned_abs();
        max_abs = max_abs.max(raw);
        sum_sq = sum_sq
            .checked_add(u128::from(raw) * u128::from(raw))
            .ok_or(FixedPointError::Overflow { op: "normalize" })?;
    }
    if sum_sq == 0 {
        return Ok(values.to_vec());
    }

    // The norm is taken on Σ xᵢ² shifted left by 2k so that the integer square
    // root keeps precision for short vectors; the numerator carries the same
    // 2^k. k is bounded by the headroom of both the sum and the numerator.
    let sum_headroom = sum_sq.leading_zeros().saturating_sub(2) / 2;
    let numerator_bits = 64 - max_abs.leading_zeros() + 31;
    let numerator_headroom = 126u32.saturating_sub(numerator_bits);
    let shift = sum_headroom.min(numerator_headroom);

    let norm = isqrt(sum_sq << (2 * shift));
    let norm = i128::try_from(norm).map_err(|_| FixedPointError::Overflow { op: "normalize" })?;
    values
        .iter()
        .map(|v| {
            let scaled = (i128::from(v.raw()) * i128::from(SCALE)) << shift;
            narrow(div_round(scaled, norm), "normalize")
        })
        .collect()
}

/// Floor of the square root of a `u128`, via Newton's iteration.
pub fn isqrt(value: u128) -> u128 {
    if value < 2 {
        return value;
    }
    let bits = 128 - value.leading_zeros();
    // 2^ceil(bits/2) is always >= sqrt(value).
    let mut x = 1u128 << bits.div_ceil(2);
    loop {
        let y = (x + value / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}
