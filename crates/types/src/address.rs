use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw width of an account identifier.
pub const ADDRESS_BYTES: usize = 20;

/// Opaque caller identity supplied by the wallet/identity provider.
///
/// Written as `0x` followed by 40 lowercase hex digits; parsing accepts
/// either case. Serde goes through the same text form so configs and
/// replay scripts stay readable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

/// Why a string is not an [`Address`].
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("address {0:?} is missing the 0x prefix")]
    MissingPrefix(String),
    #[error("address needs {} hex digits, got {digits}", ADDRESS_BYTES * 2)]
    WrongLength { digits: usize },
    #[error("address digits are not hexadecimal: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_BYTES]);

    /// Derive a stable address from a human label (first 20 bytes of its BLAKE3 hash).
    ///
    /// Used by tooling and tests to name actors ("alice", "owner") without key material.
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes.copy_from_slice(&hash.as_bytes()[..ADDRESS_BYTES]);
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| AddressError::MissingPrefix(s.to_owned()))?;
        if digits.len() != ADDRESS_BYTES * 2 {
            return Err(AddressError::WrongLength {
                digits: digits.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_BYTES];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(value: [u8; ADDRESS_BYTES]) -> Self {
        Address(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
