//! Reputation-only incentives: no deposit, no transfers, just counts.

use decai_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::claims::{check_refund, check_report, Claim, ClaimKind, Contributions, Payout};
use crate::errors::Result;
use crate::params::IncentiveParams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Points {
    params: IncentiveParams,
    #[serde(default)]
    contributions: Contributions,
    /// Successful reports filed by each address.
    #[serde(default)]
    num_reports_per_address: BTreeMap<Address, u64>,
}

impl Points {
    pub fn new(params: IncentiveParams) -> Self {
        Self {
            params,
            contributions: Contributions::default(),
            num_reports_per_address: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> &IncentiveParams {
        &self.params
    }

    pub fn contributions(&self) -> &Contributions {
        &self.contributions
    }

    pub fn reports_by(&self, address: &Address) -> u64 {
        self.num_reports_per_address
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    pub fn handle_refund(&self, claim: &Claim<'_>) -> Result<Payout> {
        check_refund(claim, &self.params)?;
        Ok(Payout {
            kind: ClaimKind::Refund,
            claimant: claim.claimant,
            submitter: claim.record.sender,
            amount: 0,
        })
    }

    pub fn handle_report(&self, claim: &Claim<'_>) -> Result<Payout> {
        check_report(claim, &self.params)?;
        Ok(Payout {
            kind: ClaimKind::Report,
            claimant: claim.claimant,
            submitter: claim.record.sender,
            amount: 0,
        })
    }

    pub(crate) fn settle(&mut self, payout: &Payout) {
        match payout.kind {
            ClaimKind::Refund => self.contributions.credit(payout.submitter),
            ClaimKind::Report => {
                let count = self
                    .num_reports_per_address
                    .entry(payout.claimant)
                    .or_insert(0);
                *count = count.saturating_add(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decai_data_handler::DataRecord;

    #[test]
    fn claims_only_update_counts() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut points = Points::new(IncentiveParams::default());
        let record = DataRecord::new([0; 32], 1, 0, alice, 0);

        let refund = points
            .handle_refund(&Claim {
                record: &record,
                claimant: alice,
                prediction: 1,
                now: 86_400,
                owner: bob,
            })
            .unwrap();
        assert_eq!(refund.amount, 0);
        points.settle(&refund);
        assert_eq!(points.contributions().good_data_of(&alice), 1);

        let report = points
            .handle_report(&Claim {
                record: &record,
                claimant: bob,
                prediction: 0,
                now: 3 * 86_400,
                owner: bob,
            })
            .unwrap();
        assert_eq!(report.amount, 0);
        points.settle(&report);
        assert_eq!(points.reports_by(&bob), 1);
        assert_eq!(points.contributions().total_good_data_count, 1);
    }
}
