//! Replay scripts: a JSON list of transactions applied in order.

use decai_classifier::Features;
use decai_trainer::{CollaborativeTrainer, InMemoryAccountLedger, TrainerEvent};
use decai_types::{Address, Amount, ClassId, Timestamp, TxContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    AddData {
        sender: Address,
        time: Timestamp,
        /// Defaults to the quoted cost.
        #[serde(default)]
        value: Option<Amount>,
        data: Features,
        classification: ClassId,
    },
    Refund {
        sender: Address,
        time: Timestamp,
        data: Features,
        classification: ClassId,
        added_time: Timestamp,
    },
    Report {
        sender: Address,
        time: Timestamp,
        data: Features,
        classification: ClassId,
        added_time: Timestamp,
        original_author: Address,
    },
}

impl Step {
    fn action(&self) -> &'static str {
        match self {
            Step::AddData { .. } => "add_data",
            Step::Refund { .. } => "refund",
            Step::Report { .. } => "report",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Accepted {
        step: usize,
        action: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        record: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<Amount>,
    },
    Rejected {
        step: usize,
        action: &'static str,
        kind: &'static str,
        retriable: bool,
        error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub outcomes: Vec<Outcome>,
    pub events: Vec<TrainerEvent>,
    pub balances: BTreeMap<Address, Amount>,
    pub escrow: Amount,
    pub model_hash: String,
}

/// Apply every step; rejected steps are recorded and skipped.
pub fn replay(trainer: &mut CollaborativeTrainer, script: &Script) -> anyhow::Result<Summary> {
    let mut accounts = InMemoryAccountLedger::new();
    let mut outcomes = Vec::with_capacity(script.steps.len());

    for (index, step) in script.steps.iter().enumerate() {
        debug!(step = index, action = step.action(), "replaying step");
        let result = match step {
            Step::AddData {
                sender,
                time,
                value,
                data,
                classification,
            } => {
                let value = value.unwrap_or_else(|| trainer.compute_cost(sender));
                let ctx = TxContext::new(*sender, *time).with_value(value);
                trainer
                    .add_data(&ctx, data, *classification, &mut accounts)
                    .map(|record| (Some(record.to_string()), None))
            }
            Step::Refund {
                sender,
                time,
                data,
                classification,
                added_time,
            } => {
                let ctx = TxContext::new(*sender, *time);
                trainer
                    .refund(&ctx, data, *classification, *added_time, &mut accounts)
                    .map(|amount| (None, Some(amount)))
            }
            Step::Report {
                sender,
                time,
                data,
                classification,
                added_time,
                original_author,
            } => {
                let ctx = TxContext::new(*sender, *time);
                trainer
                    .report(
                        &ctx,
                        data,
                        *classification,
                        *added_time,
                        *original_author,
                        &mut accounts,
                    )
                    .map(|amount| (None, Some(amount)))
            }
        };

        let outcome = match result {
            Ok((record, amount)) => Outcome::Accepted {
                step: index,
                action: step.action(),
                record,
                amount,
            },
            Err(err) => {
                warn!(step = index, kind = err.kind().as_str(), "step rejected: {err}");
                Outcome::Rejected {
                    step: index,
                    action: step.action(),
                    kind: err.kind().as_str(),
                    retriable: err.is_retriable(),
                    error: err.to_string(),
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(Summary {
        outcomes,
        events: trainer.events().to_vec(),
        balances: accounts.balances().clone(),
        escrow: trainer.escrow(),
        model_hash: trainer.model_hash()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use decai_trainer::{Deployment, DeploymentConfig};

    const CONFIG: &str = r#"
owner = "0x00000000000000000000000000000000000000aa"
name = "Alarms"

[classifier]
type = "nearest_centroid"
classifications = ["ALARM", "WEATHER"]

[[classifier.centroids]]
values = ["-1", "-1"]
sample_count = 100

[[classifier.centroids]]
values = ["1", "1"]
sample_count = 100

[incentive]
mechanism = "stakeable"
refund_wait_time = 10
owner_claim_wait_time = 20
any_address_claim_wait_time = 30
cost_weight = 100
"#;

    const SCRIPT: &str = r#"{"steps": [
        {"add_data": {"sender": "0x0000000000000000000000000000000000000001", "time": 0,
            "data": {"dense": ["0.5", "1.5"]}, "classification": 0}},
        {"report": {"sender": "0x0000000000000000000000000000000000000001", "time": 40,
            "data": {"dense": ["0.5", "1.5"]}, "classification": 0, "added_time": 0,
            "original_author": "0x0000000000000000000000000000000000000001"}},
        {"report": {"sender": "0x00000000000000000000000000000000000000aa", "time": 40,
            "data": {"dense": ["0.5", "1.5"]}, "classification": 0, "added_time": 0,
            "original_author": "0x0000000000000000000000000000000000000001"}}
    ]}"#;

    #[test]
    fn test_replay_records_rejections_and_payouts() {
        let config = DeploymentConfig::from_toml_str(CONFIG).unwrap();
        let mut trainer = Deployment::from_config(&config).unwrap().finish().unwrap();
        let script: Script = serde_json::from_str(SCRIPT).unwrap();

        let summary = replay(&mut trainer, &script).unwrap();
        assert!(matches!(summary.outcomes[0], Outcome::Accepted { .. }));
        assert!(matches!(
            summary.outcomes[1],
            Outcome::Rejected { kind: "self_dealing", retriable: false, .. }
        ));
        assert_eq!(
            summary.outcomes[2],
            Outcome::Accepted {
                step: 2,
                action: "report",
                record: None,
                amount: Some(100),
            }
        );
        assert_eq!(summary.escrow, 0);
        assert_eq!(summary.balances.get(&config.owner), Some(&100));
        assert_eq!(summary.events.len(), 2);
    }
}
