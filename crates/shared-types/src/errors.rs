//! # Error Types
//!
//! Errors shared across subsystems.

use thiserror::Error;

/// How an ingestion failure should be treated by the orchestrating caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The block can never be ingested as-is; the pipeline must halt.
    Fatal,
    /// The block may succeed if retried from the same height.
    Retryable,
}

/// Implemented by every subsystem error so the runtime can pick retry vs halt.
pub trait Classify {
    fn severity(&self) -> ErrorSeverity;

    fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }
}

/// Error returned by every storage port, tagged with the failing operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("storage operation '{operation}' failed: {message}")]
pub struct StoreError {
    pub operation: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    /// Re-tags an inner error with the outer operation, keeping the inner name.
    pub fn within(self, operation: &'static str) -> Self {
        Self {
            operation,
            message: format!("{}: {}", self.operation, self.message),
        }
    }
}

impl Classify for StoreError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_carries_operation() {
        let err = StoreError::new("save_addresses", "disk unavailable");
        assert_eq!(
            err.to_string(),
            "storage operation 'save_addresses' failed: disk unavailable"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_within_keeps_inner_operation() {
        let err = StoreError::new("put", "io").within("save_jails");
        assert_eq!(err.operation, "save_jails");
        assert_eq!(err.message, "put: io");
    }
}
