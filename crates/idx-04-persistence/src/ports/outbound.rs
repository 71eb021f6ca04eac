//! # Outbound Ports (Driven Ports)
//!
//! The key-value backend under the storage transaction. Writes only ever
//! arrive as one block's change set; reads are point lookups or scans over a
//! [`KeyRange`] of the key layout.
//!
//! Production: `RocksDbStore` (adapters/rocksdb_adapter.rs, `rocksdb` feature)
//! Testing: `InMemoryKVStore` (adapters/memory.rs)

use crate::domain::keys::KeyRange;
use crate::domain::KVStoreError;
use std::collections::BTreeMap;

/// Staged rows of one block, in key order. `None` deletes the key.
pub type ChangeSet = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Rows returned by a range scan, in key order.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    fn contains(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Applies every change in `changes` or none of them.
    fn commit(&mut self, changes: ChangeSet) -> Result<(), KVStoreError>;

    /// Rows inside `range`, in key order.
    fn scan(&self, range: &KeyRange) -> Result<ScanResult, KVStoreError>;

    /// Number of rows inside `range`.
    fn count(&self, range: &KeyRange) -> Result<usize, KVStoreError> {
        Ok(self.scan(range)?.len())
    }
}
