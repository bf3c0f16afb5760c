//! Shared identifiers for the collaborative trainer workspace.

pub mod address;
pub mod context;

pub use address::*;
pub use context::*;
