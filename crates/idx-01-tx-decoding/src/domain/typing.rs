//! # Message Typing
//!
//! Maps an opaque `(type_url, value)` payload onto the closed [`MsgKind`]
//! set. Unknown type URLs are kept as [`MsgKind::Unknown`]; known kinds with
//! a missing identifying field abort the block.

use super::decoder::{parse_amount, RawMessage};
use super::errors::DecodeError;
use super::proto::{self, Coin};
use bech32::FromBase32;
use bigdecimal::BigDecimal;
use prost::Message;
use shared_types::{
    AddressHash, BlobRef, MsgBeginRedelegate, MsgDelegate, MsgGrant, MsgKind, MsgPayForBlobs,
    MsgSend, MsgUndelegate, MsgUnjail, MsgWithdrawDelegatorReward, NamespaceKey,
};

/// Suffix of the operator address prefix (`celestia` → `celestiavaloper`).
const VALOPER_SUFFIX: &str = "valoper";

/// Types one raw message.
///
/// `prefix` is the account address prefix; operator addresses are accepted
/// with the `valoper` suffix appended. Coin amounts are summed over the
/// `denom` coins only.
pub fn type_message(raw: &RawMessage, prefix: &str, denom: &str) -> Result<MsgKind, DecodeError> {
    let value = raw.value.as_slice();
    let kind = match raw.type_url.as_str() {
        proto::MSG_SEND => {
            let msg = decode::<proto::MsgSend>(value, "MsgSend")?;
            let fields = Fields::new(prefix, "MsgSend");
            MsgKind::Send(MsgSend {
                from_address: fields.address(&msg.from_address, "from_address")?,
                to_address: fields.address(&msg.to_address, "to_address")?,
                amount: sum_coins(&msg.amount, denom)?,
            })
        }
        proto::MSG_PAY_FOR_BLOBS => {
            let msg = decode::<proto::MsgPayForBlobs>(value, "MsgPayForBlobs")?;
            let fields = Fields::new(prefix, "MsgPayForBlobs");
            MsgKind::PayForBlobs(MsgPayForBlobs {
                signer: fields.address(&msg.signer, "signer")?,
                blobs: blob_refs(&msg)?,
            })
        }
        proto::MSG_DELEGATE => {
            let msg = decode::<proto::MsgDelegate>(value, "MsgDelegate")?;
            let fields = Fields::new(prefix, "MsgDelegate");
            MsgKind::Delegate(MsgDelegate {
                delegator: fields.address(&msg.delegator_address, "delegator_address")?,
                validator: fields.address(&msg.validator_address, "validator_address")?,
                amount: fields.coin(msg.amount.as_ref())?,
                validator_address: msg.validator_address,
            })
        }
        proto::MSG_UNDELEGATE => {
            let msg = decode::<proto::MsgDelegate>(value, "MsgUndelegate")?;
            let fields = Fields::new(prefix, "MsgUndelegate");
            MsgKind::Undelegate(MsgUndelegate {
                delegator: fields.address(&msg.delegator_address, "delegator_address")?,
                validator: fields.address(&msg.validator_address, "validator_address")?,
                amount: fields.coin(msg.amount.as_ref())?,
                validator_address: msg.validator_address,
            })
        }
        proto::MSG_BEGIN_REDELEGATE => {
            let msg = decode::<proto::MsgBeginRedelegate>(value, "MsgBeginRedelegate")?;
            let fields = Fields::new(prefix, "MsgBeginRedelegate");
            MsgKind::BeginRedelegate(MsgBeginRedelegate {
                delegator: fields.address(&msg.delegator_address, "delegator_address")?,
                src_validator: fields.address(&msg.validator_src_address, "validator_src_address")?,
                dst_validator: fields.address(&msg.validator_dst_address, "validator_dst_address")?,
                amount: fields.coin(msg.amount.as_ref())?,
                src_validator_address: msg.validator_src_address,
                dst_validator_address: msg.validator_dst_address,
            })
        }
        proto::MSG_WITHDRAW_DELEGATOR_REWARD => {
            let msg =
                decode::<proto::MsgWithdrawDelegatorReward>(value, "MsgWithdrawDelegatorReward")?;
            let fields = Fields::new(prefix, "MsgWithdrawDelegatorReward");
            MsgKind::WithdrawDelegatorReward(MsgWithdrawDelegatorReward {
                delegator: fields.address(&msg.delegator_address, "delegator_address")?,
                validator: fields.address(&msg.validator_address, "validator_address")?,
            })
        }
        proto::MSG_UNJAIL => {
            let msg = decode::<proto::MsgUnjail>(value, "MsgUnjail")?;
            let fields = Fields::new(prefix, "MsgUnjail");
            MsgKind::Unjail(MsgUnjail {
                validator: fields.address(&msg.validator_addr, "validator_addr")?,
            })
        }
        proto::MSG_GRANT => {
            let msg = decode::<proto::MsgGrant>(value, "MsgGrant")?;
            let fields = Fields::new(prefix, "MsgGrant");
            MsgKind::Grant(MsgGrant {
                granter: fields.address(&msg.granter, "granter")?,
                grantee: fields.address(&msg.grantee, "grantee")?,
                authorization: msg
                    .grant
                    .and_then(|g| g.authorization)
                    .map(|a| a.type_url)
                    .unwrap_or_default(),
            })
        }
        other => MsgKind::Unknown {
            type_url: other.to_string(),
        },
    };
    Ok(kind)
}

/// Decodes a bech32 address carrying `prefix` or its operator variant.
pub fn decode_address(value: &str, prefix: &str) -> Result<AddressHash, DecodeError> {
    let invalid = |reason: String| DecodeError::InvalidAddress {
        value: value.to_string(),
        reason,
    };

    let (hrp, data, _variant) = bech32::decode(value).map_err(|e| invalid(e.to_string()))?;
    let operator = format!("{prefix}{VALOPER_SUFFIX}");
    if hrp != prefix && hrp != operator {
        return Err(invalid(format!("unexpected prefix {hrp}")));
    }
    Vec::<u8>::from_base32(&data).map_err(|e| invalid(e.to_string()))
}

fn decode<M: Message + Default>(value: &[u8], section: &'static str) -> Result<M, DecodeError> {
    M::decode(value).map_err(|e| DecodeError::malformed(section, e))
}

/// Required fields of one message kind.
struct Fields<'a> {
    prefix: &'a str,
    message: &'static str,
}

impl<'a> Fields<'a> {
    fn new(prefix: &'a str, message: &'static str) -> Self {
        Self { prefix, message }
    }

    fn address(&self, value: &str, field: &'static str) -> Result<AddressHash, DecodeError> {
        if value.is_empty() {
            return Err(DecodeError::MissingField {
                message: self.message,
                field,
            });
        }
        decode_address(value, self.prefix)
    }

    fn coin(&self, coin: Option<&Coin>) -> Result<BigDecimal, DecodeError> {
        let coin = coin.ok_or(DecodeError::MissingField {
            message: self.message,
            field: "amount",
        })?;
        parse_amount(&coin.amount)
    }
}

fn sum_coins(coins: &[Coin], denom: &str) -> Result<BigDecimal, DecodeError> {
    coins
        .iter()
        .filter(|c| c.denom == denom)
        .try_fold(BigDecimal::from(0), |acc, c| Ok(acc + parse_amount(&c.amount)?))
}

fn blob_refs(msg: &proto::MsgPayForBlobs) -> Result<Vec<BlobRef>, DecodeError> {
    if msg.namespaces.is_empty() {
        return Err(DecodeError::MissingField {
            message: "MsgPayForBlobs",
            field: "namespaces",
        });
    }
    if msg.namespaces.len() != msg.blob_sizes.len() {
        return Err(DecodeError::malformed(
            "MsgPayForBlobs",
            format!(
                "{} namespaces but {} blob sizes",
                msg.namespaces.len(),
                msg.blob_sizes.len()
            ),
        ));
    }

    msg.namespaces
        .iter()
        .zip(&msg.blob_sizes)
        .map(|(raw, size)| {
            let namespace = NamespaceKey::from_bytes(raw).ok_or_else(|| {
                DecodeError::malformed(
                    "MsgPayForBlobs",
                    format!("namespace of {} bytes", raw.len()),
                )
            })?;
            Ok(BlobRef {
                namespace,
                size: u64::from(*size),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::{ToBase32, Variant};
    use shared_types::{MessageRefs, TxAddressType, NAMESPACE_SIZE};

    // ===== TEST HELPERS =====

    fn bech(hrp: &str, hash: &[u8]) -> String {
        bech32::encode(hrp, hash.to_base32(), Variant::Bech32).unwrap()
    }

    fn account(byte: u8) -> String {
        bech("celestia", &[byte; 20])
    }

    fn raw(type_url: &str, msg: impl Message) -> RawMessage {
        RawMessage {
            type_url: type_url.into(),
            value: msg.encode_to_vec(),
        }
    }

    fn namespace(last: u8) -> Vec<u8> {
        let mut ns = vec![0u8; NAMESPACE_SIZE];
        ns[NAMESPACE_SIZE - 1] = last;
        ns
    }

    // ===== KNOWN KINDS =====

    #[test]
    fn test_send_decodes_addresses_and_native_amount() {
        let msg = proto::MsgSend {
            from_address: account(1),
            to_address: account(2),
            amount: vec![
                Coin { denom: "utia".into(), amount: "10".into() },
                Coin { denom: "uatom".into(), amount: "99".into() },
                Coin { denom: "utia".into(), amount: "5".into() },
            ],
        };

        let kind = type_message(&raw(proto::MSG_SEND, msg), "celestia", "utia").unwrap();

        let MsgKind::Send(send) = &kind else {
            panic!("expected MsgSend, got {kind:?}");
        };
        assert_eq!(send.from_address, vec![1u8; 20]);
        assert_eq!(send.amount, BigDecimal::from(15));
        assert_eq!(kind.addresses()[1].0, TxAddressType::ToAddress);
    }

    #[test]
    fn test_pfb_collects_namespaces_with_sizes() {
        let msg = proto::MsgPayForBlobs {
            signer: account(3),
            namespaces: vec![namespace(0x7a), namespace(0x7b)],
            blob_sizes: vec![100, 250],
            ..Default::default()
        };

        let kind = type_message(&raw(proto::MSG_PAY_FOR_BLOBS, msg), "celestia", "utia").unwrap();

        let blobs = kind.namespaces();
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].size, 100);
        assert_eq!(blobs[1].namespace.id[27], 0x7b);
    }

    #[test]
    fn test_pfb_size_mismatch_is_malformed() {
        let msg = proto::MsgPayForBlobs {
            signer: account(3),
            namespaces: vec![namespace(1)],
            blob_sizes: vec![],
            ..Default::default()
        };
        let result = type_message(&raw(proto::MSG_PAY_FOR_BLOBS, msg), "celestia", "utia");
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn test_delegate_accepts_operator_prefix() {
        let operator = bech("celestiavaloper", &[9; 20]);
        let msg = proto::MsgDelegate {
            delegator_address: account(4),
            validator_address: operator.clone(),
            amount: Some(Coin { denom: "utia".into(), amount: "1000".into() }),
        };

        let kind = type_message(&raw(proto::MSG_DELEGATE, msg), "celestia", "utia").unwrap();

        let changes = kind.stake_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].validator, operator);
        assert_eq!(changes[0].amount, BigDecimal::from(1000));
    }

    // ===== INTEGRITY =====

    #[test]
    fn test_missing_signer_is_integrity_error() {
        let msg = proto::MsgPayForBlobs {
            signer: String::new(),
            namespaces: vec![namespace(1)],
            blob_sizes: vec![1],
            ..Default::default()
        };

        let result = type_message(&raw(proto::MSG_PAY_FOR_BLOBS, msg), "celestia", "utia");

        assert_eq!(
            result.unwrap_err(),
            DecodeError::MissingField { message: "MsgPayForBlobs", field: "signer" }
        );
    }

    #[test]
    fn test_foreign_prefix_rejected() {
        let result = decode_address(&bech("cosmos", &[1; 20]), "celestia");
        assert!(matches!(result, Err(DecodeError::InvalidAddress { .. })));
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let message = RawMessage {
            type_url: "/cosmos.gov.v1.MsgVote".into(),
            value: vec![1, 2, 3],
        };
        let kind = type_message(&message, "celestia", "utia").unwrap();
        assert_eq!(kind, MsgKind::Unknown { type_url: "/cosmos.gov.v1.MsgVote".into() });
    }
}
