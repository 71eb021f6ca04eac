//! Domain layer for the validator lifecycle.

pub mod errors;
pub mod index;
pub mod slashing;

pub use errors::LifecycleError;
pub use index::{IndexEntry, ValidatorIndex};
pub use slashing::{SlashingConfig, JAIL_REASON_DOUBLE_SIGN, JAIL_REASON_MISSING_SIGNATURE};
