//! Data models for the SplitLedger application.
//!
//! Every update request expresses its fields through the tri-state
//! [`Patch`] descriptor so that "omitted" and "explicitly null" stay
//! distinguishable.

mod catalog;
mod group;
mod patch;
mod transaction;

pub use catalog::*;
pub use group::*;
pub use patch::*;
pub use transaction::*;
