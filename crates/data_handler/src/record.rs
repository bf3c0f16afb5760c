//! Submission records and their identifiers.

use decai_types::{Address, Amount, ClassId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// BLAKE3 digest identifying one submission.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId([u8; 32]);

impl RecordId {
    /// Digest of `(data_hash, classification, timestamp, submitter)`.
    ///
    /// Integers are little-endian and every field has a fixed width, so the
    /// encoding is unambiguous.
    pub fn derive(
        data_hash: &[u8; 32],
        classification: ClassId,
        timestamp: Timestamp,
        submitter: &Address,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"decai/record/v1");
        hasher.update(data_hash);
        hasher.update(&classification.to_le_bytes());
        hasher.update(&timestamp.to_le_bytes());
        hasher.update(submitter.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for RecordId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", &self.to_hex()[..16])
    }
}

impl FromStr for RecordId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Who is settling a claim against a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRole {
    /// The submitter taking back their own deposit.
    Submitter,
    /// Any other address claiming the deposit of bad data.
    Reporter(Address),
}

impl ClaimRole {
    pub fn of(record: &DataRecord, claimant: &Address) -> Self {
        if *claimant == record.sender {
            ClaimRole::Submitter
        } else {
            ClaimRole::Reporter(*claimant)
        }
    }
}

/// Provenance and claim state of one submission. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRecord {
    pub data_hash: [u8; 32],
    pub classification: ClassId,
    pub submitted_at: Timestamp,
    pub sender: Address,
    pub initial_deposit: Amount,
    pub claimable_amount: Amount,
    pub claimed_by_submitter: bool,
    pub claimed_by: BTreeSet<Address>,
    pub num_claims: u32,
}

impl DataRecord {
    pub fn new(
        data_hash: [u8; 32],
        classification: ClassId,
        submitted_at: Timestamp,
        sender: Address,
        deposit: Amount,
    ) -> Self {
        Self {
            data_hash,
            classification,
            submitted_at,
            sender,
            initial_deposit: deposit,
            claimable_amount: deposit,
            claimed_by_submitter: false,
            claimed_by: BTreeSet::new(),
            num_claims: 0,
        }
    }

    pub fn id(&self) -> RecordId {
        RecordId::derive(
            &self.data_hash,
            self.classification,
            self.submitted_at,
            &self.sender,
        )
    }

    pub fn has_claimed(&self, claimant: &Address) -> bool {
        match ClaimRole::of(self, claimant) {
            ClaimRole::Submitter => self.claimed_by_submitter,
            ClaimRole::Reporter(address) => self.claimed_by.contains(&address),
        }
    }

    /// Total released so far; never exceeds `initial_deposit`.
    pub fn released(&self) -> Amount {
        self.initial_deposit - self.claimable_amount
    }

    /// Seconds since submission, zero if `now` precedes it.
    pub fn elapsed(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.submitted_at)
    }
}
