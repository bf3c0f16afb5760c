//! Deterministic fixed-point arithmetic.
//!
//! Every fractional quantity in the collaborative trainer (weights,
//! centroids, learning rates, smoothing factors) is an integer pre-scaled
//! by [`SCALE`]. No floating point crosses this boundary.

pub mod errors;
pub mod fixed;
pub mod vector;

pub use errors::{FixedPointError, Result};
pub use fixed::{div_round, to_fixed, Fixed, DECIMALS, SCALE};
pub use vector::{dot, isqrt, normalize, squared_norm, Accumulator};
