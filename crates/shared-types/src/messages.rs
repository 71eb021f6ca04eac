//! # Message Kinds
//!
//! Closed set of message payloads understood by the indexer. Every kind
//! reports the addresses and namespaces it references through the
//! [`MessageRefs`] capability, so the entity graph never switches on type
//! strings.
//!
//! | Kind | Address roles | Namespaces | Stake change |
//! |------|---------------|------------|--------------|
//! | `Send` | from, to | - | - |
//! | `PayForBlobs` | signer | every blob | - |
//! | `Delegate` | delegator, validator | - | + amount |
//! | `Undelegate` | delegator, validator | - | - amount |
//! | `BeginRedelegate` | delegator, src, dst | - | - src, + dst |
//! | `WithdrawDelegatorReward` | delegator, validator | - | - |
//! | `Unjail` | validator | - | - |
//! | `Grant` | granter, grantee | - | - |

use crate::entities::{AddressHash, BlobRef, TxAddressType};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Capability shared by every message kind.
pub trait MessageRefs {
    /// Addresses referenced by the message, in field order.
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])>;

    /// Blobs written by the message.
    fn namespaces(&self) -> &[BlobRef] {
        &[]
    }

    /// Delegation changes caused by the message.
    fn stake_changes(&self) -> Vec<StakeChange> {
        Vec::new()
    }
}

/// Signed change of one delegator's stake on one validator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakeChange {
    pub delegator: AddressHash,
    /// Validator operator address.
    pub validator: String,
    #[serde(with = "crate::decimal")]
    pub amount: BigDecimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: AddressHash,
    pub to_address: AddressHash,
    #[serde(with = "crate::decimal")]
    pub amount: BigDecimal,
}

impl MessageRefs for MsgSend {
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])> {
        vec![
            (TxAddressType::FromAddress, self.from_address.as_slice()),
            (TxAddressType::ToAddress, self.to_address.as_slice()),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgPayForBlobs {
    pub signer: AddressHash,
    pub blobs: Vec<BlobRef>,
}

impl MessageRefs for MsgPayForBlobs {
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])> {
        vec![(TxAddressType::Signer, self.signer.as_slice())]
    }

    fn namespaces(&self) -> &[BlobRef] {
        &self.blobs
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgDelegate {
    pub delegator: AddressHash,
    pub validator: AddressHash,
    pub validator_address: String,
    #[serde(with = "crate::decimal")]
    pub amount: BigDecimal,
}

impl MessageRefs for MsgDelegate {
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])> {
        vec![
            (TxAddressType::DelegatorAddress, self.delegator.as_slice()),
            (TxAddressType::ValidatorAddress, self.validator.as_slice()),
        ]
    }

    fn stake_changes(&self) -> Vec<StakeChange> {
        vec![StakeChange {
            delegator: self.delegator.clone(),
            validator: self.validator_address.clone(),
            amount: self.amount.clone(),
        }]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgUndelegate {
    pub delegator: AddressHash,
    pub validator: AddressHash,
    pub validator_address: String,
    #[serde(with = "crate::decimal")]
    pub amount: BigDecimal,
}

impl MessageRefs for MsgUndelegate {
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])> {
        vec![
            (TxAddressType::DelegatorAddress, self.delegator.as_slice()),
            (TxAddressType::ValidatorAddress, self.validator.as_slice()),
        ]
    }

    fn stake_changes(&self) -> Vec<StakeChange> {
        vec![StakeChange {
            delegator: self.delegator.clone(),
            validator: self.validator_address.clone(),
            amount: -self.amount.clone(),
        }]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgBeginRedelegate {
    pub delegator: AddressHash,
    pub src_validator: AddressHash,
    pub src_validator_address: String,
    pub dst_validator: AddressHash,
    pub dst_validator_address: String,
    #[serde(with = "crate::decimal")]
    pub amount: BigDecimal,
}

impl MessageRefs for MsgBeginRedelegate {
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])> {
        vec![
            (TxAddressType::DelegatorAddress, self.delegator.as_slice()),
            (TxAddressType::ValidatorSrcAddress, self.src_validator.as_slice()),
            (TxAddressType::ValidatorDstAddress, self.dst_validator.as_slice()),
        ]
    }

    fn stake_changes(&self) -> Vec<StakeChange> {
        vec![
            StakeChange {
                delegator: self.delegator.clone(),
                validator: self.src_validator_address.clone(),
                amount: -self.amount.clone(),
            },
            StakeChange {
                delegator: self.delegator.clone(),
                validator: self.dst_validator_address.clone(),
                amount: self.amount.clone(),
            },
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgWithdrawDelegatorReward {
    pub delegator: AddressHash,
    pub validator: AddressHash,
}

impl MessageRefs for MsgWithdrawDelegatorReward {
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])> {
        vec![
            (TxAddressType::DelegatorAddress, self.delegator.as_slice()),
            (TxAddressType::ValidatorAddress, self.validator.as_slice()),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgUnjail {
    pub validator: AddressHash,
}

impl MessageRefs for MsgUnjail {
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])> {
        vec![(TxAddressType::ValidatorAddress, self.validator.as_slice())]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgGrant {
    pub granter: AddressHash,
    pub grantee: AddressHash,
    /// Type URL of the granted authorization.
    pub authorization: String,
}

impl MessageRefs for MsgGrant {
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])> {
        vec![
            (TxAddressType::Granter, self.granter.as_slice()),
            (TxAddressType::Grantee, self.grantee.as_slice()),
        ]
    }
}

/// A typed message payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MsgKind {
    Send(MsgSend),
    PayForBlobs(MsgPayForBlobs),
    Delegate(MsgDelegate),
    Undelegate(MsgUndelegate),
    BeginRedelegate(MsgBeginRedelegate),
    WithdrawDelegatorReward(MsgWithdrawDelegatorReward),
    Unjail(MsgUnjail),
    Grant(MsgGrant),
    /// A message the indexer stores but does not interpret.
    Unknown { type_url: String },
}

impl MsgKind {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Send(_) => "MsgSend",
            Self::PayForBlobs(_) => "MsgPayForBlobs",
            Self::Delegate(_) => "MsgDelegate",
            Self::Undelegate(_) => "MsgUndelegate",
            Self::BeginRedelegate(_) => "MsgBeginRedelegate",
            Self::WithdrawDelegatorReward(_) => "MsgWithdrawDelegatorReward",
            Self::Unjail(_) => "MsgUnjail",
            Self::Grant(_) => "MsgGrant",
            Self::Unknown { type_url } => type_url.as_str(),
        }
    }

    fn refs(&self) -> Option<&dyn MessageRefs> {
        match self {
            Self::Send(m) => Some(m),
            Self::PayForBlobs(m) => Some(m),
            Self::Delegate(m) => Some(m),
            Self::Undelegate(m) => Some(m),
            Self::BeginRedelegate(m) => Some(m),
            Self::WithdrawDelegatorReward(m) => Some(m),
            Self::Unjail(m) => Some(m),
            Self::Grant(m) => Some(m),
            Self::Unknown { .. } => None,
        }
    }
}

impl MessageRefs for MsgKind {
    fn addresses(&self) -> Vec<(TxAddressType, &[u8])> {
        self.refs().map(|m| m.addresses()).unwrap_or_default()
    }

    fn namespaces(&self) -> &[BlobRef] {
        self.refs().map(|m| m.namespaces()).unwrap_or_default()
    }

    fn stake_changes(&self) -> Vec<StakeChange> {
        self.refs().map(|m| m.stake_changes()).unwrap_or_default()
    }
}
