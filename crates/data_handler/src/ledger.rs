//! The data handler: append-only submission ledger.
//!
//! `mark_claimed` is the only path that releases deposit, and it settles each
//! (record, role) pair at most once.

use decai_types::{Address, Amount, ClassId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::errors::{LedgerError, Result};
use crate::record::{ClaimRole, DataRecord, RecordId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLedger {
    records: BTreeMap<RecordId, DataRecord>,
    total_deposited: Amount,
    total_released: Amount,
}

impl DataLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, record: &RecordId) -> bool {
        self.records.contains_key(record)
    }

    /// Fail with `DuplicateSubmission` if `record` already exists.
    pub fn ensure_new(&self, record: &RecordId) -> Result<()> {
        if self.contains(record) {
            return Err(LedgerError::DuplicateSubmission { record: *record });
        }
        Ok(())
    }

    /// Append a submission. An existing key is never overwritten.
    pub fn record_submission(
        &mut self,
        data_hash: [u8; 32],
        classification: ClassId,
        timestamp: Timestamp,
        submitter: Address,
        cost: Amount,
    ) -> Result<RecordId> {
        let record = RecordId::derive(&data_hash, classification, timestamp, &submitter);
        self.ensure_new(&record)?;
        self.total_deposited = self.total_deposited.saturating_add(cost);
        self.records.insert(
            record,
            DataRecord::new(data_hash, classification, timestamp, submitter, cost),
        );
        info!(
            target: "data_handler",
            %record,
            classification,
            %submitter,
            cost = %cost,
            "submission recorded"
        );
        Ok(record)
    }

    pub fn get(&self, record: &RecordId) -> Result<&DataRecord> {
        self.records
            .get(record)
            .ok_or(LedgerError::RecordNotFound { record: *record })
    }

    /// Find a submission by its natural key.
    pub fn lookup(
        &self,
        data_hash: &[u8; 32],
        classification: ClassId,
        timestamp: Timestamp,
        submitter: &Address,
    ) -> Result<(RecordId, &DataRecord)> {
        let id = RecordId::derive(data_hash, classification, timestamp, submitter);
        self.get(&id).map(|record| (id, record))
    }

    pub fn has_claimed(&self, record: &RecordId, claimant: &Address) -> Result<bool> {
        Ok(self.get(record)?.has_claimed(claimant))
    }

    /// Deposit still available; zero once fully released.
    pub fn get_claimable_amount(&self, record: &RecordId) -> Result<Amount> {
        Ok(self.get(record)?.claimable_amount)
    }

    /// Settle `claimant`'s claim for `amount`, returning what remains.
    ///
    /// The claimant's role follows from the record: its sender settles the
    /// submitter role, anyone else a reporter role of their own. A zero amount
    /// still consumes the role.
    pub fn mark_claimed(
        &mut self,
        record: &RecordId,
        claimant: &Address,
        amount: Amount,
    ) -> Result<Amount> {
        let entry = self
            .records
            .get_mut(record)
            .ok_or(LedgerError::RecordNotFound { record: *record })?;
        if entry.has_claimed(claimant) {
            warn!(target: "data_handler", %record, %claimant, "repeated claim rejected");
            return Err(LedgerError::AlreadyClaimed {
                record: *record,
                claimant: *claimant,
            });
        }
        if amount > entry.claimable_amount {
            warn!(
                target: "data_handler",
                %record,
                requested = %amount,
                available = %entry.claimable_amount,
                "claim exceeds remaining deposit"
            );
            return Err(LedgerError::ClaimExceedsBalance {
                record: *record,
                requested: amount,
                available: entry.claimable_amount,
            });
        }

        match ClaimRole::of(entry, claimant) {
            ClaimRole::Submitter => entry.claimed_by_submitter = true,
            ClaimRole::Reporter(address) => {
                entry.claimed_by.insert(address);
            }
        }
        entry.claimable_amount -= amount;
        entry.num_claims = entry.num_claims.saturating_add(1);
        let remaining = entry.claimable_amount;
        self.total_released = self.total_released.saturating_add(amount);
        info!(
            target: "data_handler",
            %record,
            %claimant,
            amount = %amount,
            remaining = %remaining,
            "claim settled"
        );
        Ok(remaining)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &DataRecord)> {
        self.records.iter()
    }

    /// Records submitted by `submitter`, in id order.
    pub fn records_by<'a>(
        &'a self,
        submitter: &'a Address,
    ) -> impl Iterator<Item = (&'a RecordId, &'a DataRecord)> + 'a {
        self.records
            .iter()
            .filter(move |(_, record)| record.sender == *submitter)
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    pub fn total_released(&self) -> Amount {
        self.total_released
    }

    /// Deposits still held across all records.
    pub fn outstanding(&self) -> Amount {
        self.total_deposited - self.total_released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn ledger_with_one(deposit: Amount) -> (DataLedger, RecordId) {
        let mut ledger = DataLedger::new();
        let id = ledger
            .record_submission([9; 32], 1, 1_000, alice(), deposit)
            .unwrap();
        (ledger, id)
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let (mut ledger, id) = ledger_with_one(100);
        assert_eq!(
            ledger.record_submission([9; 32], 1, 1_000, alice(), 50),
            Err(LedgerError::DuplicateSubmission { record: id })
        );
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get_claimable_amount(&id).unwrap(), 100);
        assert_eq!(ledger.total_deposited(), 100);
    }

    #[test]
    fn lookup_by_natural_key() {
        let (ledger, id) = ledger_with_one(100);
        let (found, record) = ledger.lookup(&[9; 32], 1, 1_000, &alice()).unwrap();
        assert_eq!(found, id);
        assert_eq!(record.sender, alice());
        assert!(matches!(
            ledger.lookup(&[9; 32], 0, 1_000, &alice()),
            Err(LedgerError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn roles_are_settled_once_each() {
        let (mut ledger, id) = ledger_with_one(100);
        assert_eq!(ledger.mark_claimed(&id, &bob(), 40).unwrap(), 60);
        assert!(ledger.has_claimed(&id, &bob()).unwrap());
        assert!(!ledger.has_claimed(&id, &alice()).unwrap());

        let err = ledger.mark_claimed(&id, &bob(), 10).unwrap_err();
        assert_eq!(err, LedgerError::AlreadyClaimed { record: id, claimant: bob() });
        assert_eq!(ledger.get_claimable_amount(&id).unwrap(), 60);

        assert_eq!(ledger.mark_claimed(&id, &alice(), 60).unwrap(), 0);
        assert!(ledger.has_claimed(&id, &alice()).unwrap());
        assert_eq!(ledger.get(&id).unwrap().num_claims, 2);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn over_claim_is_rejected_without_consuming_role() {
        let (mut ledger, id) = ledger_with_one(100);
        assert!(matches!(
            ledger.mark_claimed(&id, &bob(), 101),
            Err(LedgerError::ClaimExceedsBalance { requested: 101, available: 100, .. })
        ));
        assert!(!ledger.has_claimed(&id, &bob()).unwrap());
        ledger.mark_claimed(&id, &bob(), 100).unwrap();
    }

    #[test]
    fn zero_claim_consumes_role() {
        let (mut ledger, id) = ledger_with_one(0);
        ledger.mark_claimed(&id, &alice(), 0).unwrap();
        assert!(matches!(
            ledger.mark_claimed(&id, &alice(), 0),
            Err(LedgerError::AlreadyClaimed { .. })
        ));
    }

    #[test]
    fn records_by_filters_on_sender() {
        let (mut ledger, _) = ledger_with_one(100);
        ledger.record_submission([1; 32], 0, 5, bob(), 10).unwrap();
        ledger.record_submission([2; 32], 0, 6, bob(), 10).unwrap();
        assert_eq!(ledger.records_by(&bob()).count(), 2);
        assert_eq!(ledger.records_by(&alice()).count(), 1);
    }
}
