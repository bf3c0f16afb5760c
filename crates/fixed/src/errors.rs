//! Error types for fixed-point arithmetic

use thiserror::Error;

/// Errors raised by fixed-point operations. None of them are recoverable
/// within a call; the caller aborts before mutating any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixedPointError {
    #[error("arithmetic overflow in fixed-point {op}")]
    Overflow { op: &'static str },

    #[error("division by zero in fixed-point {op}")]
    DivisionByZero { op: &'static str },

    #[error("vector length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("logarithm of non-positive value (raw={raw})")]
    NonPositiveLogarithm { raw: i64 },

    #[error("invalid fixed-point literal {input:?}: {reason}")]
    Parse { input: String, reason: &'static str },
}

/// Result type for fixed-point operations
pub type Result<T> = std::result::Result<T, FixedPointError>;
