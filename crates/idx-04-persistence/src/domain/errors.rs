//! # Domain Errors
//!
//! Error types for the persistence subsystem.
//!
//! Key-value backend failures surface as [`KVStoreError`]; the storage
//! transaction re-tags them as [`StoreError`] with the failing operation.
//! [`PersistenceError`] is what a block commit returns.

use idx_02_entity_graph::GraphError;
use idx_03_validator_lifecycle::LifecycleError;
use shared_types::{Classify, ErrorSeverity, StoreError};
use thiserror::Error;

/// Key-value store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

impl KVStoreError {
    /// Converts into a [`StoreError`] for `operation`.
    pub fn during(self, operation: &'static str) -> StoreError {
        StoreError::new(operation, self.to_string())
    }
}

/// Errors returned by a block commit.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The block does not follow the last committed height.
    #[error("height gap: expected block {expected}, got {got}")]
    HeightGap { expected: u64, got: u64 },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for PersistenceError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::HeightGap { .. } => ErrorSeverity::Fatal,
            Self::Graph(e) => e.severity(),
            Self::Lifecycle(e) => e.severity(),
            Self::Store(e) => e.severity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_error_tagged_with_operation() {
        let err = KVStoreError::IOError {
            message: "disk failure".to_string(),
        }
        .during("save_jails");

        assert_eq!(err.operation, "save_jails");
        assert!(err.message.contains("disk failure"));
    }

    #[test]
    fn test_classification() {
        let gap = PersistenceError::HeightGap {
            expected: 11,
            got: 13,
        };
        let store = PersistenceError::from(StoreError::new("flush", "busy"));
        let integrity = PersistenceError::from(LifecycleError::UnknownJailedValidator {
            cons_address: "AA".into(),
        });

        assert!(gap.is_fatal());
        assert!(!store.is_fatal());
        assert!(integrity.is_fatal());
    }
}
