//! Submission ledger for collaborative training.
//!
//! Records who submitted which sample with which label and deposit, rejects
//! duplicate submissions, and gates every refund or report so a deposit is
//! never released twice to the same role.

pub mod errors;
pub mod ledger;
pub mod record;

pub use errors::{LedgerError, Result};
pub use ledger::DataLedger;
pub use record::{ClaimRole, DataRecord, RecordId};
