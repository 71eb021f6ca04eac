//! # Transaction Decoder
//!
//! Pure transform from raw transaction bytes to the fields the indexer
//! stores: fee, memo, timeout height and the ordered opaque messages.

use super::errors::DecodeError;
use super::proto::{Any, AuthInfo, BlobTx, Fee, TxBody, TxRaw, BLOB_TX_TYPE_ID};
use bigdecimal::BigDecimal;
use prost::Message;
use std::borrow::Cow;
use std::str::FromStr;

/// An opaque message payload, typed later by [`super::type_message`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl From<Any> for RawMessage {
    fn from(any: Any) -> Self {
        Self {
            type_url: any.type_url,
            value: any.value,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedTx {
    /// Fee in the native denomination, scale 0.
    pub fee: BigDecimal,
    pub gas_limit: u64,
    pub memo: String,
    /// Zero when the transaction does not set one.
    pub timeout_height: u64,
    pub messages: Vec<RawMessage>,
}

/// Decodes one transaction and prices its fee in `denom`.
///
/// # Errors
///
/// - `Malformed` when a protobuf section cannot be decoded
/// - `FeeCurrencies` when the fee lists more than one coin
/// - `FeeNotFound` when the fee is empty or not in `denom`
/// - `InvalidAmount` when the fee amount is not an integer
pub fn decode_tx(raw: &[u8], denom: &str) -> Result<DecodedTx, DecodeError> {
    let inner = unwrap_blob_tx(raw);

    let tx = TxRaw::decode(inner.as_ref()).map_err(|e| DecodeError::malformed("tx_raw", e))?;
    let auth_info = AuthInfo::decode(tx.auth_info_bytes.as_slice())
        .map_err(|e| DecodeError::malformed("auth_info", e))?;

    let fee = auth_info.fee.unwrap_or_default();
    let amount = fee_amount(&fee, denom)?;

    let body =
        TxBody::decode(tx.body_bytes.as_slice()).map_err(|e| DecodeError::malformed("body", e))?;

    Ok(DecodedTx {
        fee: amount,
        gas_limit: fee.gas_limit,
        memo: body.memo,
        timeout_height: body.timeout_height,
        messages: body.messages.into_iter().map(RawMessage::from).collect(),
    })
}

/// Returns the inner transaction of a blob envelope, or `raw` unchanged.
///
/// Plain transactions can accidentally parse as a `BlobTx`, so the envelope
/// is only accepted with its type marker and at least one blob.
pub fn unwrap_blob_tx(raw: &[u8]) -> Cow<'_, [u8]> {
    match BlobTx::decode(raw) {
        Ok(blob_tx) if blob_tx.type_id == BLOB_TX_TYPE_ID && !blob_tx.blobs.is_empty() => {
            Cow::Owned(blob_tx.tx)
        }
        _ => Cow::Borrowed(raw),
    }
}

/// Resolves the fee to exactly one coin in the native denomination.
pub fn fee_amount(fee: &Fee, denom: &str) -> Result<BigDecimal, DecodeError> {
    match fee.amount.as_slice() {
        [] => Err(DecodeError::FeeNotFound {
            denom: denom.to_string(),
        }),
        [coin] if coin.denom == denom => parse_amount(&coin.amount),
        [_] => Err(DecodeError::FeeNotFound {
            denom: denom.to_string(),
        }),
        coins => Err(DecodeError::FeeCurrencies { count: coins.len() }),
    }
}

/// Parses a base-10 integer amount into a scale-0 decimal.
pub fn parse_amount(value: &str) -> Result<BigDecimal, DecodeError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::InvalidAmount {
            value: value.to_string(),
        });
    }
    BigDecimal::from_str(value).map_err(|_| DecodeError::InvalidAmount {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::proto::{Blob, Coin};

    // ===== TEST HELPERS =====

    fn coin(denom: &str, amount: &str) -> Coin {
        Coin {
            denom: denom.into(),
            amount: amount.into(),
        }
    }

    fn make_tx(coins: Vec<Coin>, memo: &str) -> Vec<u8> {
        let body = TxBody {
            messages: vec![Any {
                type_url: "/cosmos.bank.v1beta1.MsgSend".into(),
                value: vec![],
            }],
            memo: memo.into(),
            timeout_height: 0,
        };
        let auth_info = AuthInfo {
            fee: Some(Fee {
                amount: coins,
                gas_limit: 80_000,
                ..Default::default()
            }),
        };
        TxRaw {
            body_bytes: body.encode_to_vec(),
            auth_info_bytes: auth_info.encode_to_vec(),
            signatures: vec![vec![7; 64]],
        }
        .encode_to_vec()
    }

    // ===== FEE RESOLUTION =====

    #[test]
    fn test_single_native_fee_decodes_exactly() {
        let raw = make_tx(vec![coin("utia", "21000")], "hello");

        let decoded = decode_tx(&raw, "utia").unwrap();

        assert_eq!(decoded.fee, BigDecimal::from(21000));
        assert_eq!(decoded.fee.as_bigint_and_exponent().1, 0);
        assert_eq!(decoded.gas_limit, 80_000);
        assert_eq!(decoded.memo, "hello");
        assert_eq!(decoded.timeout_height, 0);
        assert_eq!(decoded.messages.len(), 1);
    }

    #[test]
    fn test_two_currencies_is_fee_currency_error() {
        let raw = make_tx(vec![coin("utia", "1"), coin("uatom", "2")], "");

        let err = decode_tx(&raw, "utia").unwrap_err();

        assert_eq!(err, DecodeError::FeeCurrencies { count: 2 });
    }

    #[test]
    fn test_empty_fee_is_fee_missing_error() {
        let raw = make_tx(vec![], "");

        let err = decode_tx(&raw, "utia").unwrap_err();

        assert!(matches!(err, DecodeError::FeeNotFound { .. }));
    }

    #[test]
    fn test_foreign_denom_is_fee_missing_error() {
        let raw = make_tx(vec![coin("uatom", "5")], "");
        assert!(matches!(
            decode_tx(&raw, "utia"),
            Err(DecodeError::FeeNotFound { .. })
        ));
    }

    #[test]
    fn test_fractional_amount_rejected() {
        assert!(matches!(
            parse_amount("1.5"),
            Err(DecodeError::InvalidAmount { .. })
        ));
        assert!(parse_amount("").is_err());
        assert_eq!(
            parse_amount("340282366920938463463374607431768211456").unwrap(),
            BigDecimal::from_str("340282366920938463463374607431768211456").unwrap()
        );
    }

    // ===== ENVELOPES =====

    #[test]
    fn test_blob_envelope_is_unwrapped() {
        let inner = make_tx(vec![coin("utia", "300")], "blob");
        let wrapped = BlobTx {
            tx: inner.clone(),
            blobs: vec![Blob {
                namespace_id: vec![0; 28],
                data: vec![1, 2, 3],
                share_version: 0,
                namespace_version: 0,
            }],
            type_id: BLOB_TX_TYPE_ID.into(),
        }
        .encode_to_vec();

        assert_eq!(unwrap_blob_tx(&wrapped).as_ref(), inner.as_slice());
        let decoded = decode_tx(&wrapped, "utia").unwrap();
        assert_eq!(decoded.memo, "blob");
        assert_eq!(decoded.fee, BigDecimal::from(300));
    }

    #[test]
    fn test_plain_tx_is_not_unwrapped() {
        let raw = make_tx(vec![coin("utia", "1")], "");
        assert!(matches!(unwrap_blob_tx(&raw), Cow::Borrowed(_)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = decode_tx(&[0xff, 0xff, 0xff], "utia").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }
}
