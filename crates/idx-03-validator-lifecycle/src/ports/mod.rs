//! Ports for the validator lifecycle.

pub mod outbound;

pub use outbound::ValidatorStore;
