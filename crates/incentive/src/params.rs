use decai_types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::errors::{IncentiveError, Result};

const DAY: Timestamp = 24 * 60 * 60;

/// Claim windows and pricing shared by every mechanism.
///
/// Windows are measured in seconds from the submission timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentiveParams {
    /// Before this the submitter cannot take their deposit back.
    pub refund_wait_time: Timestamp,
    /// Before this the deployment owner cannot report bad data.
    pub owner_claim_wait_time: Timestamp,
    /// Before this nobody else can report bad data.
    pub any_address_claim_wait_time: Timestamp,
    /// Deposit asked of an address with no good contributions yet.
    #[serde(default)]
    pub cost_weight: Amount,
}

impl Default for IncentiveParams {
    fn default() -> Self {
        Self {
            refund_wait_time: DAY,
            owner_claim_wait_time: 3 * DAY,
            any_address_claim_wait_time: 7 * DAY,
            cost_weight: 1_000_000_000_000,
        }
    }
}

impl IncentiveParams {
    /// `refund ≤ owner ≤ any`. Mechanisms do not enforce this themselves;
    /// deployment tooling calls it before deploying.
    pub fn validate(&self) -> Result<()> {
        if self.refund_wait_time > self.owner_claim_wait_time {
            return Err(IncentiveError::InvalidParameter(format!(
                "refund_wait_time {} exceeds owner_claim_wait_time {}",
                self.refund_wait_time, self.owner_claim_wait_time
            )));
        }
        if self.owner_claim_wait_time > self.any_address_claim_wait_time {
            return Err(IncentiveError::InvalidParameter(format!(
                "owner_claim_wait_time {} exceeds any_address_claim_wait_time {}",
                self.owner_claim_wait_time, self.any_address_claim_wait_time
            )));
        }
        Ok(())
    }
}
