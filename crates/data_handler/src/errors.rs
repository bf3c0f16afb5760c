//! Error types for the submission ledger

use decai_types::{Address, Amount};
use thiserror::Error;

use crate::record::RecordId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("submission {record} already recorded")]
    DuplicateSubmission { record: RecordId },

    #[error("no submission recorded under {record}")]
    RecordNotFound { record: RecordId },

    #[error("{claimant} already claimed submission {record}")]
    AlreadyClaimed { record: RecordId, claimant: Address },

    #[error("claim of {requested} on {record} exceeds remaining {available}")]
    ClaimExceedsBalance {
        record: RecordId,
        requested: Amount,
        available: Amount,
    },
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
