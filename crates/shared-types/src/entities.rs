//! # Core Domain Entities
//!
//! Rows produced by block ingestion.
//!
//! Global entities (`Address`, `Namespace`, `Validator`) are shared across
//! blocks and unique by their natural key. Everything else is created once per
//! occurrence and never mutated after commit, except `State` which is updated
//! in place once per block.

use crate::messages::MsgKind;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw address hash (20 bytes for accounts and operators).
pub type AddressHash = Vec<u8>;

/// Length of the namespace id without its version byte.
pub const NAMESPACE_ID_SIZE: usize = 28;

/// Length of a versioned namespace: 1 version byte + 28 id bytes.
pub const NAMESPACE_SIZE: usize = NAMESPACE_ID_SIZE + 1;

/// Composite natural key of a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespaceKey {
    pub version: u8,
    pub id: Vec<u8>,
}

impl NamespaceKey {
    pub fn new(version: u8, id: impl Into<Vec<u8>>) -> Self {
        Self {
            version,
            id: id.into(),
        }
    }

    /// Splits a 29-byte versioned namespace. Returns `None` on any other length.
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        if raw.len() != NAMESPACE_SIZE {
            return None;
        }
        Some(Self::new(raw[0], &raw[1..]))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.id.len());
        out.push(self.version);
        out.extend_from_slice(&self.id);
        out
    }
}

impl fmt::Display for NamespaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// A blob written by a message into a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub namespace: NamespaceKey,
    pub size: u64,
}

/// Execution result of a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    #[default]
    Success,
    Failed,
}

/// Per-block aggregates, stored next to the block row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockStats {
    pub height: u64,
    pub time: DateTime<Utc>,
    pub tx_count: u64,
    pub events_count: u64,
    pub blobs_size: u64,
    pub blobs_count: u64,
    #[serde(with = "crate::decimal")]
    pub fee: BigDecimal,
    #[serde(with = "crate::decimal")]
    pub supply_change: BigDecimal,
}

/// A fully typed block ready for the entity graph stage.
///
/// Only the header fields are part of the stored row; stats, transactions,
/// events and validator updates are written to their own tables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub hash: Vec<u8>,
    pub time: DateTime<Utc>,
    pub chain_id: String,
    #[serde(skip)]
    pub stats: BlockStats,
    /// Transactions in block-position order.
    #[serde(skip)]
    pub txs: Vec<Tx>,
    /// Events owned by the block itself (begin/end block).
    #[serde(skip)]
    pub events: Vec<Event>,
    #[serde(skip)]
    pub validators: ValidatorUpdates,
    #[serde(skip)]
    pub genesis_accounts: Vec<GenesisAccount>,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        !self.genesis_accounts.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    pub id: u64,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub position: u64,
    pub hash: Vec<u8>,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub timeout_height: u64,
    pub events_count: u64,
    pub messages_count: u64,
    pub status: TxStatus,
    pub error: String,
    pub codespace: String,
    #[serde(with = "crate::decimal")]
    pub fee: BigDecimal,
    pub memo: String,
    #[serde(skip)]
    pub messages: Vec<Message>,
    #[serde(skip)]
    pub events: Vec<Event>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub height: u64,
    pub time: DateTime<Utc>,
    /// Position inside the owning transaction.
    pub position: u64,
    /// Owning transaction identity, 0 until the transaction is saved.
    pub tx_id: u64,
    pub kind: MsgKind,
}

impl Message {
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub position: u64,
    /// Set only for events emitted by a transaction.
    pub tx_id: Option<u64>,
    pub event_type: String,
    pub data: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(with = "crate::decimal")]
    pub spendable: BigDecimal,
    #[serde(with = "crate::decimal")]
    pub delegated: BigDecimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: u64,
    /// Height of the first occurrence.
    pub height: u64,
    pub last_height: u64,
    pub hash: AddressHash,
    pub balance: Balance,
}

impl Address {
    pub fn new(hash: AddressHash, height: u64) -> Self {
        Self {
            hash,
            height,
            last_height: height,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: u64,
    pub key: NamespaceKey,
    /// Cumulative blob bytes written to the namespace.
    pub size: u64,
    /// Number of blob submissions that targeted the namespace.
    pub pfb_count: u64,
    pub height: u64,
    pub last_height: u64,
    pub last_message_time: DateTime<Utc>,
}

impl Namespace {
    pub fn new(key: NamespaceKey, height: u64, time: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            key,
            size: 0,
            pfb_count: 0,
            height,
            last_height: height,
            last_message_time: time,
        }
    }
}

/// Junction between a message and a namespace it wrote to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMessage {
    pub namespace_id: u64,
    pub msg_id: u64,
    pub tx_id: u64,
    pub height: u64,
    pub time: DateTime<Utc>,
}

/// Role an address plays in a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxAddressType {
    ValidatorAddress,
    DelegatorAddress,
    ValidatorSrcAddress,
    ValidatorDstAddress,
    FromAddress,
    ToAddress,
    Grantee,
    Granter,
    Signer,
}

impl TxAddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidatorAddress => "validatorAddress",
            Self::DelegatorAddress => "delegatorAddress",
            Self::ValidatorSrcAddress => "validatorSrcAddress",
            Self::ValidatorDstAddress => "validatorDstAddress",
            Self::FromAddress => "fromAddress",
            Self::ToAddress => "toAddress",
            Self::Grantee => "grantee",
            Self::Granter => "granter",
            Self::Signer => "signer",
        }
    }
}

/// Junction between a transaction and an address, tagged with its role.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxAddress {
    pub tx_id: u64,
    pub address_id: u64,
    pub role: TxAddressType,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Validator {
    pub id: u64,
    /// Operator address (bech32 with the `valoper` prefix).
    pub address: String,
    /// Consensus address, hex encoded. Empty when unknown.
    pub cons_address: String,
    pub moniker: String,
    #[serde(with = "crate::decimal")]
    pub rate: BigDecimal,
    #[serde(with = "crate::decimal")]
    pub stake: BigDecimal,
    pub jailed: bool,
    pub height: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Jail {
    pub id: u64,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub validator_id: u64,
    pub cons_address: String,
    pub reason: String,
    /// Total stake removed from delegations by this jailing.
    #[serde(with = "crate::decimal")]
    pub burned: BigDecimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    pub address_id: u64,
    pub validator_id: u64,
    #[serde(with = "crate::decimal")]
    pub amount: BigDecimal,
}

/// Balance delta applied to an address. Both fields are signed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub address_id: u64,
    #[serde(with = "crate::decimal")]
    pub spendable: BigDecimal,
    #[serde(with = "crate::decimal")]
    pub delegated: BigDecimal,
}

/// Validator set changes observed in one block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorUpdates {
    /// New or updated validators.
    pub validators: Vec<Validator>,
    /// Validators jailed in this block, keyed by consensus address.
    pub jailed: BTreeMap<String, Validator>,
    pub jails: Vec<Jail>,
}

impl ValidatorUpdates {
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty() && self.jailed.is_empty() && self.jails.is_empty()
    }
}

/// Initial account balance carried by the genesis block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub hash: AddressHash,
    #[serde(with = "crate::decimal")]
    pub balance: BigDecimal,
}

/// Singleton row per named indexer instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: u64,
    pub name: String,
    pub last_height: u64,
    pub last_hash: Vec<u8>,
    pub last_time: DateTime<Utc>,
    pub chain_id: String,
    pub total_tx: u64,
    pub total_accounts: u64,
    pub total_namespaces: u64,
    pub total_blobs_size: u64,
    #[serde(with = "crate::decimal")]
    pub total_supply: BigDecimal,
    #[serde(with = "crate::decimal")]
    pub total_fee: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_key_splits_version_byte() {
        let mut raw = vec![0u8; NAMESPACE_SIZE];
        raw[NAMESPACE_SIZE - 2] = 0x5f;
        raw[NAMESPACE_SIZE - 1] = 0x7a;

        let key = NamespaceKey::from_bytes(&raw).unwrap();
        assert_eq!(key.version, 0);
        assert_eq!(key.id.len(), NAMESPACE_ID_SIZE);
        assert_eq!(key.to_bytes(), raw);
        assert!(key.to_string().ends_with("5f7a"));
    }

    #[test]
    fn test_namespace_key_rejects_wrong_length() {
        assert!(NamespaceKey::from_bytes(&[0u8; 10]).is_none());
    }

    #[test]
    fn test_block_row_excludes_nested_collections() {
        let block = Block {
            height: 7,
            txs: vec![Tx::default()],
            ..Default::default()
        };

        let bytes = bincode::serialize(&block).unwrap();
        let restored: Block = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.height, 7);
        assert!(restored.txs.is_empty());
    }

    #[test]
    fn test_tx_address_type_names() {
        assert_eq!(TxAddressType::ValidatorSrcAddress.as_str(), "validatorSrcAddress");
        assert_eq!(
            serde_json::to_string(&TxAddressType::Signer).unwrap(),
            "\"signer\""
        );
    }
}
