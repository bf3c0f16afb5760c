//! Error types for the classifier engine

use decai_fixed::FixedPointError;
use decai_types::ClassId;
use thiserror::Error;

/// Errors raised by classifier operations.
///
/// All of them are caller programming errors: the operation is rejected
/// before any weight, centroid or count is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: u64,
        len: u64,
    },

    #[error("class {name:?} already exists at index {index}")]
    DuplicateClass { name: String, index: ClassId },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid model parameters: {0}")]
    InvalidParameters(String),

    #[error("{operation} is not supported by the {variant} classifier")]
    UnsupportedOperation {
        operation: &'static str,
        variant: &'static str,
    },

    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] FixedPointError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for classifier operations
pub type Result<T> = std::result::Result<T, ClassifierError>;

pub(crate) fn class_out_of_range(index: ClassId, len: usize) -> ClassifierError {
    ClassifierError::IndexOutOfRange {
        what: "class",
        index,
        len: len as u64,
    }
}
