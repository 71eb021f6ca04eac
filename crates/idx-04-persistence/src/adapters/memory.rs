use crate::domain::keys::KeyRange;
use crate::domain::KVStoreError;
use crate::ports::{ChangeSet, KeyValueStore, ScanResult};
use std::collections::BTreeMap;

/// Ordered in-memory store, so range scans match RocksDB's key order.
///
/// Used by tests and when no data directory is configured.
#[derive(Default, Debug, Clone)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn contains(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.contains_key(key))
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<(), KVStoreError> {
        // Single owner: no reader can observe a half-applied set.
        for (key, value) in changes {
            match value {
                Some(value) => self.data.insert(key, value),
                None => self.data.remove(&key),
            };
        }
        Ok(())
    }

    fn scan(&self, range: &KeyRange) -> Result<ScanResult, KVStoreError> {
        let rows = self
            .data
            .range::<[u8], _>(range.bounds())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(rows)
    }

    fn count(&self, range: &KeyRange) -> Result<usize, KVStoreError> {
        Ok(self.data.range::<[u8], _>(range.bounds()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::keys::{self, Table};

    // ===== TEST HELPERS =====

    fn make_store(keys: &[Vec<u8>]) -> InMemoryKVStore {
        let mut store = InMemoryKVStore::new();
        let changes = keys
            .iter()
            .map(|key| (key.clone(), Some(b"row".to_vec())))
            .collect();
        store.commit(changes).unwrap();
        store
    }

    // ===== COMMIT =====

    #[test]
    fn test_commit_applies_writes_and_deletes() {
        // Arrange
        let mut store = make_store(&[keys::block_key(1), keys::state_key("celestia_indexer")]);
        let mut changes = ChangeSet::new();
        changes.insert(keys::block_key(2), Some(b"next".to_vec()));
        changes.insert(keys::block_key(1), None);

        // Act
        store.commit(changes).unwrap();

        // Assert
        assert_eq!(store.len(), 2);
        assert!(!store.contains(&keys::block_key(1)).unwrap());
        assert_eq!(store.get(&keys::block_key(2)).unwrap(), Some(b"next".to_vec()));
    }

    // ===== SCAN =====

    #[test]
    fn test_table_scan_skips_sibling_tables() {
        let store = make_store(&[
            keys::block_key(2),
            keys::block_key(1),
            keys::block_stats_key(1),
            keys::address_hash_key(&[7; 20]),
        ]);

        let blocks = store.scan(&KeyRange::table(Table::Block)).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, keys::block_key(1));
        assert_eq!(store.count(&KeyRange::table(Table::BlockStats)).unwrap(), 1);
        assert_eq!(store.count(&KeyRange::table(Table::Address)).unwrap(), 0);
    }

    #[test]
    fn test_partition_scan_stays_inside_partition() {
        let store = make_store(&[
            keys::partitioned_key("tx_2023_11", 1),
            keys::partitioned_key("tx_2023_12", 2),
            Table::TxAddress.row_key(1),
        ]);

        let rows = store.scan(&KeyRange::partition("tx_2023_11")).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, keys::partitioned_key("tx_2023_11", 1));
    }
}
