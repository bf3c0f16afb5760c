//! Events appended by the trainer for external mirrors.

use decai_data_handler::RecordId;
use decai_types::{Address, Amount, ClassId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrainerEvent {
    AddData {
        record: RecordId,
        sender: Address,
        /// Hex BLAKE3 of the canonical feature encoding.
        data_hash: String,
        classification: ClassId,
        timestamp: Timestamp,
        cost: Amount,
    },
    Refund {
        record: RecordId,
        recipient: Address,
        amount: Amount,
        timestamp: Timestamp,
    },
    Report {
        record: RecordId,
        recipient: Address,
        submitter: Address,
        amount: Amount,
        timestamp: Timestamp,
    },
}

impl TrainerEvent {
    pub fn record(&self) -> &RecordId {
        match self {
            TrainerEvent::AddData { record, .. }
            | TrainerEvent::Refund { record, .. }
            | TrainerEvent::Report { record, .. } => record,
        }
    }
}
