//! # Entity Graph Errors

use shared_types::{Classify, ErrorSeverity, StoreError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A message references an address with no bytes.
    #[error("tx {tx} message {message}: empty {role} address")]
    EmptyAddress {
        tx: u64,
        message: u64,
        role: &'static str,
    },

    /// Messages cannot be linked before their transaction is saved.
    #[error("tx at position {position} has no identity")]
    UnsavedTransaction { position: u64 },

    /// Junction rows need the message identity.
    #[error("message {position} of tx {tx_id} has no identity")]
    UnsavedMessage { tx_id: u64, position: u64 },

    #[error("junction rows requested before addresses and namespaces were persisted")]
    NotPersisted,

    /// Storage returned without assigning an identity.
    #[error("{entity} {key} received no identity from storage")]
    MissingIdentity { entity: &'static str, key: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for GraphError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Store(e) => e.severity(),
            _ => ErrorSeverity::Fatal,
        }
    }
}
