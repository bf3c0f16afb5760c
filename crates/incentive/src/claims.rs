//! Claim gating shared by all mechanisms.
//!
//! Resolving a claim is split in two: `check_*` inspects a record and the
//! current prediction without touching state and yields a [`Payout`]; the
//! mechanism's `settle` applies the bookkeeping once the ledger has accepted
//! the payout. A rejected ledger write therefore leaves the counters as they
//! were.

use decai_data_handler::DataRecord;
use decai_types::{Address, Amount, ClassId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{IncentiveError, InvalidState, Result};
use crate::params::IncentiveParams;

/// A request to resolve one submission.
#[derive(Debug, Clone, Copy)]
pub struct Claim<'a> {
    pub record: &'a DataRecord,
    pub claimant: Address,
    /// What the model predicts for the submitted data now.
    pub prediction: ClassId,
    pub now: Timestamp,
    /// The deployment owner, who reports on the shorter window.
    pub owner: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Refund,
    Report,
}

/// Outcome of an accepted claim, settled after the ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub kind: ClaimKind,
    pub claimant: Address,
    pub submitter: Address,
    pub amount: Amount,
}

/// Good-data reputation, monotonic for the life of a deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributions {
    pub total_good_data_count: u64,
    pub num_good_data_per_address: BTreeMap<Address, u64>,
}

impl Contributions {
    pub fn good_data_of(&self, address: &Address) -> u64 {
        self.num_good_data_per_address
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn credit(&mut self, address: Address) {
        self.total_good_data_count = self.total_good_data_count.saturating_add(1);
        let count = self.num_good_data_per_address.entry(address).or_insert(0);
        *count = count.saturating_add(1);
    }
}

/// Submitter refund: window open, model still agrees, not yet refunded.
pub(crate) fn check_refund(claim: &Claim<'_>, params: &IncentiveParams) -> Result<()> {
    let record = claim.record;
    if claim.claimant != record.sender {
        return Err(InvalidState::NotSubmitter.into());
    }
    if record.claimed_by_submitter {
        return Err(IncentiveError::AlreadyClaimed {
            claimant: claim.claimant,
        });
    }
    let elapsed = record.elapsed(claim.now);
    if elapsed < params.refund_wait_time {
        return Err(InvalidState::TooEarly {
            elapsed,
            required: params.refund_wait_time,
        }
        .into());
    }
    if claim.prediction != record.classification {
        return Err(InvalidState::ModelDisagrees.into());
    }
    Ok(())
}

/// Report on bad data: never by the submitter, model disagrees, and the
/// owner's or everyone's window is open.
pub(crate) fn check_report(claim: &Claim<'_>, params: &IncentiveParams) -> Result<()> {
    let record = claim.record;
    if claim.claimant == record.sender {
        return Err(IncentiveError::SelfReport {
            reporter: claim.claimant,
        });
    }
    if record.claimed_by.contains(&claim.claimant) {
        return Err(IncentiveError::AlreadyClaimed {
            claimant: claim.claimant,
        });
    }
    let elapsed = record.elapsed(claim.now);
    let required = if claim.claimant == claim.owner {
        params.owner_claim_wait_time
    } else {
        params.any_address_claim_wait_time
    };
    if elapsed < required {
        return Err(InvalidState::TooEarly { elapsed, required }.into());
    }
    if claim.prediction == record.classification {
        return Err(InvalidState::ModelAgrees.into());
    }
    Ok(())
}

/// `floor(initial_deposit · good / total_good)`.
///
/// Falls back to `claimable` when the share is zero, exceeds what is left,
/// or nobody has contributed good data yet.
pub fn proportional_share(
    initial_deposit: Amount,
    good: u64,
    total_good: u64,
    claimable: Amount,
) -> Result<Amount> {
    if total_good == 0 {
        return Ok(claimable);
    }
    let share = initial_deposit
        .checked_mul(Amount::from(good))
        .ok_or(IncentiveError::Overflow("report share"))?
        / Amount::from(total_good);
    if share == 0 || share > claimable {
        Ok(claimable)
    } else {
        Ok(share)
    }
}
