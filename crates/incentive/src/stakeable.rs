//! Deposit-based incentives.
//!
//! Every submission locks a deposit. The submitter gets it back once the
//! model has agreed with their label for `refund_wait_time`; if the model
//! comes to disagree, reporters split it.

use decai_types::{Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claims::{check_refund, check_report, proportional_share, Claim, ClaimKind, Contributions, Payout};
use crate::errors::{InvalidState, Result};
use crate::params::IncentiveParams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeable {
    params: IncentiveParams,
    #[serde(default)]
    contributions: Contributions,
}

impl Stakeable {
    pub fn new(params: IncentiveParams) -> Self {
        Self {
            params,
            contributions: Contributions::default(),
        }
    }

    pub fn params(&self) -> &IncentiveParams {
        &self.params
    }

    pub fn contributions(&self) -> &Contributions {
        &self.contributions
    }

    /// `cost_weight / (1 + good contributions of sender)`, floored.
    pub fn compute_cost(&self, sender: &Address) -> Amount {
        let good = Amount::from(self.contributions.good_data_of(sender));
        self.params.cost_weight / good.saturating_add(1)
    }

    /// The whole remaining deposit goes back to the submitter.
    pub fn handle_refund(&self, claim: &Claim<'_>) -> Result<Payout> {
        check_refund(claim, &self.params)?;
        let amount = claim.record.claimable_amount;
        if amount == 0 {
            return Err(InvalidState::NothingToClaim.into());
        }
        Ok(Payout {
            kind: ClaimKind::Refund,
            claimant: claim.claimant,
            submitter: claim.record.sender,
            amount,
        })
    }

    /// The owner takes everything left; anyone else takes a share weighted
    /// by their own good contributions.
    pub fn handle_report(&self, claim: &Claim<'_>) -> Result<Payout> {
        check_report(claim, &self.params)?;
        let record = claim.record;
        if record.claimable_amount == 0 {
            return Err(InvalidState::NothingToClaim.into());
        }
        let amount = if claim.claimant == claim.owner {
            record.claimable_amount
        } else {
            proportional_share(
                record.initial_deposit,
                self.contributions.good_data_of(&claim.claimant),
                self.contributions.total_good_data_count,
                record.claimable_amount,
            )?
        };
        debug!(
            target: "incentive",
            reporter = %claim.claimant,
            amount = %amount,
            claimable = %record.claimable_amount,
            "report reward computed"
        );
        Ok(Payout {
            kind: ClaimKind::Report,
            claimant: claim.claimant,
            submitter: record.sender,
            amount,
        })
    }

    pub(crate) fn settle(&mut self, payout: &Payout) {
        if payout.kind == ClaimKind::Refund {
            self.contributions.credit(payout.submitter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decai_data_handler::DataRecord;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn owner() -> Address {
        Address::from_label("owner")
    }

    fn mechanism() -> Stakeable {
        Stakeable::new(IncentiveParams {
            refund_wait_time: 10,
            owner_claim_wait_time: 20,
            any_address_claim_wait_time: 30,
            cost_weight: 1_000_000_000_000,
        })
    }

    #[test]
    fn cost_halves_after_one_good_contribution() {
        let mut stake = mechanism();
        assert_eq!(stake.compute_cost(&alice()), 1_000_000_000_000);
        let record = DataRecord::new([0; 32], 0, 0, alice(), 1_000_000_000_000);
        let claim = Claim {
            record: &record,
            claimant: alice(),
            prediction: 0,
            now: 10,
            owner: owner(),
        };
        let payout = stake.handle_refund(&claim).unwrap();
        assert_eq!(payout.amount, 1_000_000_000_000);
        stake.settle(&payout);
        assert_eq!(stake.compute_cost(&alice()), 500_000_000_000);
        assert_eq!(stake.contributions().total_good_data_count, 1);
    }

    #[test]
    fn handlers_do_not_mutate() {
        let stake = mechanism();
        let record = DataRecord::new([0; 32], 0, 0, alice(), 100);
        let claim = Claim {
            record: &record,
            claimant: alice(),
            prediction: 0,
            now: 50,
            owner: owner(),
        };
        let before = stake.clone();
        stake.handle_refund(&claim).unwrap();
        assert_eq!(stake, before);
    }

    #[test]
    fn owner_takes_remaining_deposit() {
        let stake = mechanism();
        let mut record = DataRecord::new([0; 32], 0, 0, alice(), 100);
        record.claimable_amount = 70;
        let claim = Claim {
            record: &record,
            claimant: owner(),
            prediction: 1,
            now: 20,
            owner: owner(),
        };
        assert_eq!(stake.handle_report(&claim).unwrap().amount, 70);
    }

    #[test]
    fn exhausted_deposit_cannot_be_refunded() {
        let stake = mechanism();
        let mut record = DataRecord::new([0; 32], 0, 0, alice(), 100);
        record.claimable_amount = 0;
        let claim = Claim {
            record: &record,
            claimant: alice(),
            prediction: 0,
            now: 10,
            owner: owner(),
        };
        assert_eq!(
            stake.handle_refund(&claim),
            Err(InvalidState::NothingToClaim.into())
        );
    }

    #[test]
    fn state_is_params_and_contributions_only() {
        let stake = mechanism();
        let record = DataRecord::new([0; 32], 0, 0, alice(), 1_000);
        let claim = Claim {
            record: &record,
            claimant: owner(),
            prediction: 1,
            now: 30,
            owner: owner(),
        };
        let before = stake.clone();
        stake.handle_report(&claim).unwrap();
        assert_eq!(stake, before);

        let json = serde_json::to_value(&stake).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["contributions", "params"]);
    }
}
