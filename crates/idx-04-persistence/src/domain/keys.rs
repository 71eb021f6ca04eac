//! # Key Layout
//!
//! Every row lives under a table prefix. Integer components are big-endian so
//! a [`KeyRange`] over a table returns rows in identity order.
//!
//! | Key | Value |
//! |-----|-------|
//! | `block:{height}` | `Block` |
//! | `block_stats:{height}` | `BlockStats` |
//! | `{partition}:{id}` | `Tx`, `Message`, `Event` |
//! | `address:{id}` / `address_hash:{hash}` | `Address` / id |
//! | `namespace:{id}` / `namespace_key:{version}{id}` | `Namespace` / id |
//! | `namespace_message:{namespace_id}{msg_id}` | `NamespaceMessage` |
//! | `tx_address:{address_id}{tx_id}{role}` | `TxAddress` |
//! | `validator:{id}` / `validator_address:{operator}` | `Validator` / id |
//! | `jail:{id}` | `Jail` |
//! | `delegation:{address_id}{validator_id}` | `Delegation` |
//! | `delegation_validator:{validator_id}{address_id}` | empty |
//! | `state:{name}` | `State` |
//! | `meta:partition:{name}` | `Partition` |
//! | `meta:seq:{table}` | last issued id |

use shared_types::{NamespaceKey, TxAddressType};
use std::ops::Bound;

/// Logical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Block,
    BlockStats,
    Tx,
    Message,
    Event,
    Address,
    Namespace,
    NamespaceMessage,
    TxAddress,
    Validator,
    Jail,
    Delegation,
    State,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Block => "block",
            Table::BlockStats => "block_stats",
            Table::Tx => "tx",
            Table::Message => "message",
            Table::Event => "event",
            Table::Address => "address",
            Table::Namespace => "namespace",
            Table::NamespaceMessage => "namespace_message",
            Table::TxAddress => "tx_address",
            Table::Validator => "validator",
            Table::Jail => "jail",
            Table::Delegation => "delegation",
            Table::State => "state",
        }
    }

    /// `{table}:`
    fn prefix(&self) -> Vec<u8> {
        prefixed(self.as_str(), &[])
    }

    /// `{table}:{id}`
    pub fn row_key(&self, id: u64) -> Vec<u8> {
        prefixed(self.as_str(), &id.to_be_bytes())
    }
}

fn prefixed(name: &str, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 1 + suffix.len());
    key.extend_from_slice(name.as_bytes());
    key.push(b':');
    key.extend_from_slice(suffix);
    key
}

pub fn block_key(height: u64) -> Vec<u8> {
    Table::Block.row_key(height)
}

pub fn block_stats_key(height: u64) -> Vec<u8> {
    Table::BlockStats.row_key(height)
}

/// Row key inside a partition: `{partition}:{id}`.
pub fn partitioned_key(partition: &str, id: u64) -> Vec<u8> {
    prefixed(partition, &id.to_be_bytes())
}

pub fn address_hash_key(hash: &[u8]) -> Vec<u8> {
    prefixed("address_hash", hash)
}

pub fn namespace_key_index(key: &NamespaceKey) -> Vec<u8> {
    prefixed("namespace_key", &key.to_bytes())
}

pub fn namespace_message_key(namespace_id: u64, msg_id: u64) -> Vec<u8> {
    let mut suffix = namespace_id.to_be_bytes().to_vec();
    suffix.extend_from_slice(&msg_id.to_be_bytes());
    prefixed(Table::NamespaceMessage.as_str(), &suffix)
}

pub fn tx_address_key(address_id: u64, tx_id: u64, role: TxAddressType) -> Vec<u8> {
    let mut suffix = address_id.to_be_bytes().to_vec();
    suffix.extend_from_slice(&tx_id.to_be_bytes());
    suffix.push(role as u8);
    prefixed(Table::TxAddress.as_str(), &suffix)
}

pub fn validator_address_key(operator: &str) -> Vec<u8> {
    prefixed("validator_address", operator.as_bytes())
}

pub fn delegation_key(address_id: u64, validator_id: u64) -> Vec<u8> {
    let mut suffix = address_id.to_be_bytes().to_vec();
    suffix.extend_from_slice(&validator_id.to_be_bytes());
    prefixed(Table::Delegation.as_str(), &suffix)
}

/// Reverse index used to find the delegations of one validator.
pub fn delegation_by_validator_key(validator_id: u64, address_id: u64) -> Vec<u8> {
    let mut suffix = validator_id.to_be_bytes().to_vec();
    suffix.extend_from_slice(&address_id.to_be_bytes());
    prefixed("delegation_validator", &suffix)
}

/// Address identity from a `delegation_validator` key.
pub fn delegator_from_index_key(key: &[u8]) -> Option<u64> {
    let tail = key.len().checked_sub(8)?;
    let bytes: [u8; 8] = key[tail..].try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

pub fn state_key(name: &str) -> Vec<u8> {
    prefixed(Table::State.as_str(), name.as_bytes())
}

pub const PARTITION_REGISTRY_PREFIX: &[u8] = b"meta:partition:";

pub fn partition_registry_key(name: &str) -> Vec<u8> {
    let mut key = PARTITION_REGISTRY_PREFIX.to_vec();
    key.extend_from_slice(name.as_bytes());
    key
}

pub fn sequence_key(table: Table) -> Vec<u8> {
    let mut key = b"meta:seq:".to_vec();
    key.extend_from_slice(table.as_str().as_bytes());
    key
}

/// Half-open key range `[start, end)`; `end = None` runs to the last key.
///
/// Ranges are built from the key layout above, never from raw bytes at the
/// call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    start: Vec<u8>,
    end: Option<Vec<u8>>,
}

impl KeyRange {
    /// Every key starting with `prefix`.
    fn prefixed_by(prefix: Vec<u8>) -> Self {
        let end = successor(&prefix);
        Self { start: prefix, end }
    }

    /// All rows of an unpartitioned table.
    pub fn table(table: Table) -> Self {
        Self::prefixed_by(table.prefix())
    }

    /// All rows of one time partition.
    pub fn partition(name: &str) -> Self {
        Self::prefixed_by(prefixed(name, &[]))
    }

    /// The partition registry.
    pub fn partitions() -> Self {
        Self::prefixed_by(PARTITION_REGISTRY_PREFIX.to_vec())
    }

    /// Reverse-index entries of the delegations to one validator.
    pub fn delegations_to(validator_id: u64) -> Self {
        Self::prefixed_by(prefixed("delegation_validator", &validator_id.to_be_bytes()))
    }

    pub fn start(&self) -> &[u8] {
        &self.start
    }

    pub fn end(&self) -> Option<&[u8]> {
        self.end.as_deref()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_deref().map_or(true, |end| key < end)
    }

    /// Bounds for `BTreeMap::range` over byte keys.
    pub fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let end = match &self.end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        (Bound::Included(self.start.as_slice()), end)
    }
}

/// Smallest key greater than every key starting with `prefix`.
fn successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
