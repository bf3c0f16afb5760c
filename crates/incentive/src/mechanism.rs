//! Dispatch over the two incentive mechanisms.
//!
//! Claim decisions are pure; state only changes in [`IncentiveMechanism::settle`]
//! once the caller has paid out.

use decai_types::{Address, Amount, TxContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::claims::{Claim, ClaimKind, Contributions, Payout};
use crate::errors::{IncentiveError, Result};
use crate::params::IncentiveParams;
use crate::points::Points;
use crate::stakeable::Stakeable;

/// The incentive mechanism a deployment runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncentiveMechanism {
    Points(Points),
    Stakeable(Stakeable),
}

impl IncentiveMechanism {
    pub fn points(params: IncentiveParams) -> Self {
        IncentiveMechanism::Points(Points::new(params))
    }

    pub fn stakeable(params: IncentiveParams) -> Self {
        IncentiveMechanism::Stakeable(Stakeable::new(params))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IncentiveMechanism::Points(_) => "points",
            IncentiveMechanism::Stakeable(_) => "stakeable",
        }
    }

    pub fn params(&self) -> &IncentiveParams {
        match self {
            IncentiveMechanism::Points(m) => m.params(),
            IncentiveMechanism::Stakeable(m) => m.params(),
        }
    }

    pub fn contributions(&self) -> &Contributions {
        match self {
            IncentiveMechanism::Points(m) => m.contributions(),
            IncentiveMechanism::Stakeable(m) => m.contributions(),
        }
    }

    pub fn total_good_data_count(&self) -> u64 {
        self.contributions().total_good_data_count
    }

    pub fn num_good_data(&self, address: &Address) -> u64 {
        self.contributions().good_data_of(address)
    }

    /// Deposit `sender` must attach to their next submission.
    pub fn compute_cost(&self, sender: &Address) -> Amount {
        match self {
            IncentiveMechanism::Points(_) => 0,
            IncentiveMechanism::Stakeable(m) => m.compute_cost(sender),
        }
    }

    /// Cost of the call in `ctx`, rejected if the attached value is short.
    pub fn check_payment(&self, ctx: &TxContext) -> Result<Amount> {
        let cost = self.compute_cost(&ctx.sender);
        debug!(target: "incentive", sender = %ctx.sender, cost = %cost, "submission cost");
        if ctx.value < cost {
            return Err(IncentiveError::InsufficientPayment {
                required: cost,
                provided: ctx.value,
            });
        }
        Ok(cost)
    }

    /// Decide a refund without changing any state.
    pub fn handle_refund(&self, claim: &Claim<'_>) -> Result<Payout> {
        match self {
            IncentiveMechanism::Points(m) => m.handle_refund(claim),
            IncentiveMechanism::Stakeable(m) => m.handle_refund(claim),
        }
    }

    /// Decide a report without changing any state.
    pub fn handle_report(&self, claim: &Claim<'_>) -> Result<Payout> {
        match self {
            IncentiveMechanism::Points(m) => m.handle_report(claim),
            IncentiveMechanism::Stakeable(m) => m.handle_report(claim),
        }
    }

    /// Apply the bookkeeping of a payout the ledger has accepted.
    pub fn settle(&mut self, payout: &Payout) {
        match self {
            IncentiveMechanism::Points(m) => m.settle(payout),
            IncentiveMechanism::Stakeable(m) => m.settle(payout),
        }
        let action = match payout.kind {
            ClaimKind::Refund => "refund settled",
            ClaimKind::Report => "report settled",
        };
        info!(
            target: "incentive",
            kind = self.kind(),
            claimant = %payout.claimant,
            submitter = %payout.submitter,
            amount = %payout.amount,
            total_good = self.total_good_data_count(),
            "{action}"
        );
    }
}
