//! Trainer error type and its stable classification into [`ErrorKind`].

use decai_classifier::ClassifierError;
use decai_data_handler::LedgerError;
use decai_incentive::IncentiveError;
use decai_types::{Address, Amount};
use thiserror::Error;

/// Errors returned by the collaborative trainer and its deployment tooling.
///
/// Every failing entry point leaves classifier, ledger, incentive state,
/// escrow and account balances exactly as they were.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("incentive error: {0}")]
    Incentive(#[from] IncentiveError),

    #[error("chunk of {len} entries exceeds the per-call limit of {max}")]
    ChunkTooLarge { len: usize, max: usize },

    #[error("account error for {address}: {reason}")]
    Account { address: Address, reason: String },

    #[error("escrow cannot release {requested}, holding {held}")]
    EscrowShortfall { requested: Amount, held: Amount },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

/// The five ways a call can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input; fix it and resubmit.
    Validation,
    /// Claim window or model agreement not satisfied.
    TimingGate,
    /// The (record, role) pair was already settled.
    DoubleClaim,
    /// Attached value below the submission cost.
    InsufficientPayment,
    /// Reporting one's own submission.
    SelfDealing,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::TimingGate => "timing_gate",
            ErrorKind::DoubleClaim => "double_claim",
            ErrorKind::InsufficientPayment => "insufficient_payment",
            ErrorKind::SelfDealing => "self_dealing",
        }
    }
}

impl TrainerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrainerError::Ledger(LedgerError::AlreadyClaimed { .. })
            | TrainerError::Incentive(IncentiveError::AlreadyClaimed { .. }) => {
                ErrorKind::DoubleClaim
            }
            TrainerError::Incentive(IncentiveError::InvalidState(_)) => ErrorKind::TimingGate,
            TrainerError::Incentive(IncentiveError::InsufficientPayment { .. }) => {
                ErrorKind::InsufficientPayment
            }
            TrainerError::Incentive(IncentiveError::SelfReport { .. }) => ErrorKind::SelfDealing,
            _ => ErrorKind::Validation,
        }
    }

    /// Only a claim that came too early can succeed later unchanged.
    pub fn is_retriable(&self) -> bool {
        match self {
            TrainerError::Incentive(IncentiveError::InvalidState(reason)) => reason.is_retriable(),
            _ => false,
        }
    }
}

/// Result type for trainer operations
pub type Result<T> = std::result::Result<T, TrainerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use decai_incentive::InvalidState;

    #[test]
    fn kinds_follow_taxonomy() {
        let early: TrainerError = IncentiveError::from(InvalidState::TooEarly {
            elapsed: 1,
            required: 2,
        })
        .into();
        assert_eq!(early.kind(), ErrorKind::TimingGate);
        assert!(early.is_retriable());

        let agrees: TrainerError = IncentiveError::from(InvalidState::ModelAgrees).into();
        assert_eq!(agrees.kind(), ErrorKind::TimingGate);
        assert!(!agrees.is_retriable());

        let paid: TrainerError = IncentiveError::InsufficientPayment {
            required: 2,
            provided: 1,
        }
        .into();
        assert_eq!(paid.kind(), ErrorKind::InsufficientPayment);
        assert!(paid.to_string().contains("required 2, provided 1"));

        let dup: TrainerError = ClassifierError::DuplicateClass {
            name: "A".into(),
            index: 0,
        }
        .into();
        assert_eq!(dup.kind(), ErrorKind::Validation);
        assert_eq!(ErrorKind::SelfDealing.as_str(), "self_dealing");
    }
}
