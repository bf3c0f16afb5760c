//! Random operation sequences against a stakeable nearest-centroid trainer.

use decai_classifier::{Centroid, FeatureStore, Features, NearestCentroid};
use decai_fixed::Fixed;
use decai_incentive::{IncentiveMechanism, IncentiveParams};
use decai_trainer::{
    AccountLedger, CollaborativeTrainer, Deployment, ErrorKind, InMemoryAccountLedger,
};
use decai_types::{Address, TxContext};
use proptest::prelude::*;

const SAMPLES: [[&str; 2]; 4] = [["-1.5", "-0.5"], ["-0.8", "-1.1"], ["0.5", "1.5"], ["1.2", "0.9"]];

#[derive(Debug, Clone)]
enum Op {
    Add {
        sender: usize,
        sample: usize,
        label: u64,
    },
    Refund {
        index: usize,
    },
    Report {
        reporter: usize,
        index: usize,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize, 0..SAMPLES.len(), 0..2u64)
            .prop_map(|(sender, sample, label)| Op::Add { sender, sample, label }),
        (0..16usize).prop_map(|index| Op::Refund { index }),
        (0..4usize, 0..16usize).prop_map(|(reporter, index)| Op::Report { reporter, index }),
    ]
}

/// Contributors 0..3; index 3 is the deployment owner.
fn address(index: usize) -> Address {
    match index {
        0 => Address::from_label("alice"),
        1 => Address::from_label("bob"),
        2 => Address::from_label("carol"),
        _ => Address::from_label("owner"),
    }
}

fn sample(index: usize) -> Features {
    Features::Dense(SAMPLES[index].iter().map(|v| v.parse().unwrap()).collect())
}

fn trainer() -> CollaborativeTrainer {
    let centroid = |v: i64| {
        let value = Fixed::from_integer(v).unwrap();
        Centroid::new(FeatureStore::dense(vec![value, value]), 3).unwrap()
    };
    let model = NearestCentroid::new(
        vec!["ALARM".into(), "WEATHER".into()],
        vec![centroid(-1), centroid(1)],
    )
    .unwrap();
    let params = IncentiveParams {
        refund_wait_time: 5,
        owner_claim_wait_time: 10,
        any_address_claim_wait_time: 15,
        cost_weight: 1_000,
    };
    Deployment::new(address(3), "Alarms", model.into(), IncentiveMechanism::stakeable(params))
        .finish()
        .unwrap()
}

struct Submitted {
    sender: Address,
    sample: usize,
    label: u64,
    time: u64,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_deposits_are_conserved_and_claimed_once(
        steps in prop::collection::vec((op_strategy(), 0..8u64), 1..40)
    ) {
        let mut trainer = trainer();
        let mut accounts = InMemoryAccountLedger::new();
        let mut submitted: Vec<Submitted> = Vec::new();
        let mut now = 0u64;

        for (op, dt) in steps {
            now += dt;
            match op {
                Op::Add { sender, sample: index, label } => {
                    let sender = address(sender);
                    let cost = trainer.compute_cost(&sender);
                    let ctx = TxContext::new(sender, now).with_value(cost);
                    if trainer.add_data(&ctx, &sample(index), label, &mut accounts).is_ok() {
                        submitted.push(Submitted { sender, sample: index, label, time: now });
                    }
                }
                Op::Refund { index } if !submitted.is_empty() => {
                    let entry = &submitted[index % submitted.len()];
                    let ctx = TxContext::new(entry.sender, now);
                    let data = sample(entry.sample);
                    if trainer.refund(&ctx, &data, entry.label, entry.time, &mut accounts).is_ok() {
                        let again = trainer
                            .refund(&ctx, &data, entry.label, entry.time, &mut accounts)
                            .unwrap_err();
                        prop_assert_eq!(again.kind(), ErrorKind::DoubleClaim);
                    }
                }
                Op::Report { reporter, index } if !submitted.is_empty() => {
                    let entry = &submitted[index % submitted.len()];
                    let ctx = TxContext::new(address(reporter), now);
                    let data = sample(entry.sample);
                    let result = trainer.report(
                        &ctx, &data, entry.label, entry.time, entry.sender, &mut accounts,
                    );
                    if result.is_ok() {
                        let again = trainer
                            .report(&ctx, &data, entry.label, entry.time, entry.sender, &mut accounts)
                            .unwrap_err();
                        prop_assert_eq!(again.kind(), ErrorKind::DoubleClaim);
                    }
                }
                _ => {}
            }

            let ledger = trainer.data_handler();
            prop_assert_eq!(trainer.escrow(), ledger.outstanding());
            prop_assert_eq!(
                accounts.total_supply() + trainer.escrow(),
                ledger.total_deposited()
            );
            for (_, record) in ledger.iter() {
                prop_assert!(record.claimable_amount <= record.initial_deposit);
                prop_assert_eq!(record.released() + record.claimable_amount, record.initial_deposit);
            }
        }

        let paid: u128 = (0..4).map(|i| accounts.balance(&address(i))).sum();
        prop_assert_eq!(paid, accounts.total_supply());
    }
}
