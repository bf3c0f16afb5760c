//! Collaborative training over an untrusted set of contributors.
//!
//! A [`Deployment`] assembles a classifier, the submission ledger and an
//! incentive mechanism; [`Deployment::finish`] hands them to a
//! [`CollaborativeTrainer`], whose `add_data`, `refund` and `report` entry
//! points are the only way to change them afterwards.
//!
//! Modules:
//! - `config`: deployment files (TOML or JSON) and their validation
//! - `deployment`: two-phase construction with chunked model growth
//! - `trainer`: the orchestrating entry points
//! - `accounts`: payout settlement
//! - `events`: event log for external mirrors

pub mod accounts;
pub mod config;
pub mod deployment;
pub mod errors;
pub mod events;
pub mod trainer;

pub use accounts::{AccountLedger, InMemoryAccountLedger};
pub use config::{
    CentroidConfig, ClassifierConfig, DeploymentConfig, IncentiveConfig, MechanismKind, Storage,
    UnitConfig,
};
pub use deployment::Deployment;
pub use errors::{ErrorKind, Result, TrainerError};
pub use events::TrainerEvent;
pub use trainer::CollaborativeTrainer;
