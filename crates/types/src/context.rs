//! Per-call execution context handed in by the host ledger.

use crate::address::Address;
use serde::{Deserialize, Serialize};

/// Funds in the ledger's smallest indivisible unit.
pub type Amount = u128;

/// Block time in whole seconds.
pub type Timestamp = u64;

/// Index into a classifier's `classifications` list.
pub type ClassId = u64;

/// What the host environment knows about the transaction being executed.
///
/// Mirrors the sender / block time / attached value triple every entry point
/// receives; the core never reads a clock of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub sender: Address,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub value: Amount,
}

impl TxContext {
    pub fn new(sender: Address, timestamp: Timestamp) -> Self {
        Self {
            sender,
            timestamp,
            value: 0,
        }
    }

    /// Attach a payment to the call.
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}
