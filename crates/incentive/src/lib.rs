//! Incentive mechanisms for collaborative training.
//!
//! Modules:
//! - `params`: claim windows and cost weight
//! - `claims`: claim gating, payouts and the proportional report share
//! - `stakeable`: deposit-based mechanism
//! - `points`: reputation-only mechanism
//! - `mechanism`: the tagged mechanism a deployment runs with

pub mod claims;
pub mod errors;
pub mod mechanism;
pub mod params;
pub mod points;
pub mod stakeable;

pub use claims::{proportional_share, Claim, ClaimKind, Contributions, Payout};
pub use errors::{IncentiveError, InvalidState, Result};
pub use mechanism::IncentiveMechanism;
pub use params::IncentiveParams;
pub use points::Points;
pub use stakeable::Stakeable;
