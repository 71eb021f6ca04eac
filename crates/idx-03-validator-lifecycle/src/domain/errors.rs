//! # Validator Lifecycle Errors

use shared_types::{Classify, ErrorSeverity, StoreError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// A jailing references a consensus address with no known validator.
    #[error("unknown jailed validator: {cons_address}")]
    UnknownJailedValidator { cons_address: String },

    /// A stake change targets an operator address with no known validator.
    #[error("unknown validator: {operator}")]
    UnknownValidator { operator: String },

    /// A stake change comes from an address outside the block graph.
    #[error("unknown delegator address: {address}")]
    UnknownDelegator { address: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for LifecycleError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Store(e) => e.severity(),
            _ => ErrorSeverity::Fatal,
        }
    }
}
