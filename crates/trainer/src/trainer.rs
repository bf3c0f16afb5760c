//! The collaborative trainer: sole owner and mutator of a deployment's
//! classifier, submission ledger and incentive mechanism.
//!
//! Every entry point validates first and mutates last, so a rejected call
//! leaves all state, escrow and account balances untouched.

use decai_classifier::{Classifier, Features};
use decai_data_handler::{DataLedger, DataRecord, RecordId};
use decai_incentive::{Claim, ClaimKind, IncentiveMechanism, IncentiveParams, Payout};
use decai_types::{Address, Amount, ClassId, Timestamp, TxContext};
use tracing::{debug, info, warn};

use crate::accounts::{credit_then_commit, AccountLedger};
use crate::errors::{Result, TrainerError};
use crate::events::TrainerEvent;

#[derive(Debug, Clone)]
pub struct CollaborativeTrainer {
    owner: Address,
    name: String,
    description: String,
    classifier: Classifier,
    data_handler: DataLedger,
    incentive: IncentiveMechanism,
    /// Deposits held: received minus released.
    escrow: Amount,
    events: Vec<TrainerEvent>,
}

impl CollaborativeTrainer {
    pub(crate) fn new(
        owner: Address,
        name: String,
        description: String,
        classifier: Classifier,
        data_handler: DataLedger,
        incentive: IncentiveMechanism,
    ) -> Self {
        Self {
            owner,
            name,
            description,
            classifier,
            data_handler,
            incentive,
            escrow: 0,
            events: Vec::new(),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn classifications(&self) -> &[String] {
        self.classifier.classifications()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn data_handler(&self) -> &DataLedger {
        &self.data_handler
    }

    pub fn incentive(&self) -> &IncentiveMechanism {
        &self.incentive
    }

    pub fn incentive_params(&self) -> &IncentiveParams {
        self.incentive.params()
    }

    pub fn escrow(&self) -> Amount {
        self.escrow
    }

    pub fn events(&self) -> &[TrainerEvent] {
        &self.events
    }

    pub fn model_hash(&self) -> Result<String> {
        Ok(self.classifier.model_hash()?)
    }

    pub fn predict(&self, data: &Features) -> Result<ClassId> {
        Ok(self.classifier.predict(data)?)
    }

    /// Deposit `sender` must attach to their next `add_data`.
    pub fn compute_cost(&self, sender: &Address) -> Amount {
        self.incentive.compute_cost(sender)
    }

    /// Train on one labelled sample, locking the sender's deposit.
    ///
    /// `ctx.value` is the payment received with the call; anything above
    /// the cost is credited back to the sender.
    pub fn add_data<A: AccountLedger + ?Sized>(
        &mut self,
        ctx: &TxContext,
        data: &Features,
        classification: ClassId,
        accounts: &mut A,
    ) -> Result<RecordId> {
        let cost = self.incentive.check_payment(ctx)?;
        let data_hash = data.data_hash()?;
        let record = RecordId::derive(&data_hash, classification, ctx.timestamp, &ctx.sender);
        self.data_handler.ensure_new(&record)?;
        let escrow = self
            .escrow
            .checked_add(cost)
            .ok_or(TrainerError::EscrowShortfall {
                requested: cost,
                held: self.escrow,
            })?;
        let change = ctx.value - cost;

        credit_then_commit(accounts, &ctx.sender, change, || {
            self.classifier.update(data, classification)?;
            Ok(())
        })?;

        // Nothing below can fail: the record key was checked above.
        let recorded = self.data_handler.record_submission(
            data_hash,
            classification,
            ctx.timestamp,
            ctx.sender,
            cost,
        )?;
        debug_assert_eq!(recorded, record);
        self.escrow = escrow;
        self.events.push(TrainerEvent::AddData {
            record,
            sender: ctx.sender,
            data_hash: hex::encode(data_hash),
            classification,
            timestamp: ctx.timestamp,
            cost,
        });
        info!(
            target: "trainer",
            %record,
            sender = %ctx.sender,
            classification,
            cost = %cost,
            change = %change,
            "data added"
        );
        Ok(record)
    }

    /// Return the sender's deposit for a sample the model still agrees with.
    pub fn refund<A: AccountLedger + ?Sized>(
        &mut self,
        ctx: &TxContext,
        data: &Features,
        classification: ClassId,
        added_time: Timestamp,
        accounts: &mut A,
    ) -> Result<Amount> {
        let (record, payout) = self.resolve(
            ctx,
            data,
            classification,
            added_time,
            ctx.sender,
            ClaimKind::Refund,
        )?;
        self.pay(ctx, record, payout, accounts)
    }

    /// Claim (part of) the deposit of a sample the model now disagrees with.
    pub fn report<A: AccountLedger + ?Sized>(
        &mut self,
        ctx: &TxContext,
        data: &Features,
        classification: ClassId,
        added_time: Timestamp,
        original_author: Address,
        accounts: &mut A,
    ) -> Result<Amount> {
        let (record, payout) = self.resolve(
            ctx,
            data,
            classification,
            added_time,
            original_author,
            ClaimKind::Report,
        )?;
        self.pay(ctx, record, payout, accounts)
    }

    /// Look up the record and decide the claim without mutating anything.
    fn resolve(
        &self,
        ctx: &TxContext,
        data: &Features,
        classification: ClassId,
        added_time: Timestamp,
        submitter: Address,
        kind: ClaimKind,
    ) -> Result<(RecordId, Payout)> {
        let data_hash = data.data_hash()?;
        let (record, entry): (RecordId, &DataRecord) =
            self.data_handler
                .lookup(&data_hash, classification, added_time, &submitter)?;
        let prediction = self.classifier.predict(data)?;
        debug!(
            target: "trainer",
            %record,
            prediction,
            classification,
            "prediction for claim"
        );
        let claim = Claim {
            record: entry,
            claimant: ctx.sender,
            prediction,
            now: ctx.timestamp,
            owner: self.owner,
        };
        let decided = match kind {
            ClaimKind::Refund => self.incentive.handle_refund(&claim),
            ClaimKind::Report => self.incentive.handle_report(&claim),
        };
        match decided {
            Ok(payout) => Ok((record, payout)),
            Err(err) => {
                warn!(
                    target: "trainer",
                    %record,
                    claimant = %ctx.sender,
                    ?kind,
                    error = %err,
                    "claim rejected"
                );
                Err(err.into())
            }
        }
    }

    fn pay<A: AccountLedger + ?Sized>(
        &mut self,
        ctx: &TxContext,
        record: RecordId,
        payout: Payout,
        accounts: &mut A,
    ) -> Result<Amount> {
        let escrow = self
            .escrow
            .checked_sub(payout.amount)
            .ok_or(TrainerError::EscrowShortfall {
                requested: payout.amount,
                held: self.escrow,
            })?;

        let data_handler = &mut self.data_handler;
        credit_then_commit(accounts, &payout.claimant, payout.amount, || {
            data_handler.mark_claimed(&record, &payout.claimant, payout.amount)?;
            Ok(())
        })?;

        self.incentive.settle(&payout);
        self.escrow = escrow;
        let event = match payout.kind {
            ClaimKind::Refund => TrainerEvent::Refund {
                record,
                recipient: payout.claimant,
                amount: payout.amount,
                timestamp: ctx.timestamp,
            },
            ClaimKind::Report => TrainerEvent::Report {
                record,
                recipient: payout.claimant,
                submitter: payout.submitter,
                amount: payout.amount,
                timestamp: ctx.timestamp,
            },
        };
        self.events.push(event);
        info!(
            target: "trainer",
            %record,
            claimant = %payout.claimant,
            ?payout.kind,
            amount = %payout.amount,
            escrow = %self.escrow,
            "claim paid"
        );
        Ok(payout.amount)
    }
}
