//! # Decoding Errors
//!
//! Every variant is fatal for the containing block: a block whose
//! transactions cannot be decoded or priced is never partially indexed.

use shared_types::{Classify, ErrorSeverity};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A protobuf section could not be decoded.
    #[error("malformed {section}: {reason}")]
    Malformed {
        section: &'static str,
        reason: String,
    },

    /// The fee is expressed in more than one currency.
    #[error("found fee in {count} currencies")]
    FeeCurrencies { count: usize },

    /// The fee list is empty or lacks the native denomination.
    #[error("fee in {denom} not found")]
    FeeNotFound { denom: String },

    /// An amount is not a base-10 integer.
    #[error("invalid amount: {value:?}")]
    InvalidAmount { value: String },

    /// A message lacks a field that identifies one of its references.
    #[error("{message} is missing required field '{field}'")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    /// An address is not valid bech32 or carries a foreign prefix.
    #[error("invalid address {value:?}: {reason}")]
    InvalidAddress { value: String, reason: String },

    /// An error raised while decoding one transaction of a block.
    #[error("block {height} tx {position}: {source}")]
    InTx {
        height: u64,
        position: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub fn malformed(section: &'static str, reason: impl ToString) -> Self {
        Self::Malformed {
            section,
            reason: reason.to_string(),
        }
    }

    /// Attaches the transaction location.
    pub fn in_tx(self, height: u64, position: usize) -> Self {
        Self::InTx {
            height,
            position,
            source: Box::new(self),
        }
    }

    /// The innermost error, without location wrappers.
    pub fn root(&self) -> &DecodeError {
        match self {
            Self::InTx { source, .. } => source.root(),
            other => other,
        }
    }
}

impl Classify for DecodeError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_currency_message_carries_count() {
        let err = DecodeError::FeeCurrencies { count: 2 };
        assert_eq!(err.to_string(), "found fee in 2 currencies");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_in_tx_wraps_and_root_unwraps() {
        let err = DecodeError::FeeNotFound {
            denom: "utia".into(),
        }
        .in_tx(1000, 3);

        assert_eq!(err.to_string(), "block 1000 tx 3: fee in utia not found");
        assert!(matches!(err.root(), DecodeError::FeeNotFound { .. }));
    }
}
