//! Error types for incentive mechanisms

use decai_types::{Address, Amount, Timestamp};
use thiserror::Error;

/// Why a refund or report is not payable right now.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidState {
    #[error("claim window not open: {elapsed}s elapsed, {required}s required")]
    TooEarly { elapsed: Timestamp, required: Timestamp },

    #[error("the model now disagrees with the submitted label")]
    ModelDisagrees,

    #[error("the model still agrees with the submitted label")]
    ModelAgrees,

    #[error("only the submitter can take a refund")]
    NotSubmitter,

    #[error("no deposit left to claim")]
    NothingToClaim,
}

impl InvalidState {
    /// Only the time window can open later; every other reason is final for
    /// the record.
    pub fn is_retriable(&self) -> bool {
        matches!(self, InvalidState::TooEarly { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IncentiveError {
    #[error("invalid state: {0}")]
    InvalidState(#[from] InvalidState),

    #[error("insufficient payment: required {required}, provided {provided}")]
    InsufficientPayment { required: Amount, provided: Amount },

    #[error("{claimant} already claimed this submission")]
    AlreadyClaimed { claimant: Address },

    #[error("cannot take your own deposit ({reporter})")]
    SelfReport { reporter: Address },

    #[error("invalid incentive parameter: {0}")]
    InvalidParameter(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

/// Result type for incentive operations
pub type Result<T> = std::result::Result<T, IncentiveError>;
