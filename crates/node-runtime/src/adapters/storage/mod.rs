//! # Storage Backend Selection
//!
//! Picks the key-value store behind the persistence coordinator.
//!
//! ## Usage
//!
//! Enable the `rocksdb` feature and set `IDX_DATA_DIR` to persist to disk:
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! Without a data directory, blocks are kept in memory for the lifetime of
//! the process.

use crate::container::IndexerConfig;
use idx_04_persistence::{
    ChangeSet, InMemoryKVStore, KVStoreError, KeyRange, KeyValueStore, ScanResult,
};
#[cfg(feature = "rocksdb")]
use idx_04_persistence::{RocksDbConfig, RocksDbStore};
use tracing::info;

/// The configured key-value store.
pub enum StorageBackend {
    Memory(InMemoryKVStore),
    #[cfg(feature = "rocksdb")]
    RocksDb(RocksDbStore),
}

impl StorageBackend {
    /// Opens the store described by `config`.
    pub fn open(config: &IndexerConfig) -> Result<Self, KVStoreError> {
        match &config.data_dir {
            #[cfg(feature = "rocksdb")]
            Some(dir) => {
                let store = RocksDbStore::open(RocksDbConfig::at(dir.clone()))?;
                info!(path = %dir.display(), "[runtime] RocksDB storage opened");
                Ok(Self::RocksDb(store))
            }
            #[cfg(not(feature = "rocksdb"))]
            Some(dir) => {
                tracing::warn!(
                    path = %dir.display(),
                    "[runtime] built without the rocksdb feature, using in-memory storage"
                );
                Ok(Self::Memory(InMemoryKVStore::new()))
            }
            None => {
                info!("[runtime] in-memory storage");
                Ok(Self::Memory(InMemoryKVStore::new()))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            #[cfg(feature = "rocksdb")]
            Self::RocksDb(_) => "rocksdb",
        }
    }
}

impl KeyValueStore for StorageBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        match self {
            Self::Memory(kv) => kv.get(key),
            #[cfg(feature = "rocksdb")]
            Self::RocksDb(kv) => kv.get(key),
        }
    }

    fn contains(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        match self {
            Self::Memory(kv) => kv.contains(key),
            #[cfg(feature = "rocksdb")]
            Self::RocksDb(kv) => kv.contains(key),
        }
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<(), KVStoreError> {
        match self {
            Self::Memory(kv) => kv.commit(changes),
            #[cfg(feature = "rocksdb")]
            Self::RocksDb(kv) => kv.commit(changes),
        }
    }

    fn scan(&self, range: &KeyRange) -> Result<ScanResult, KVStoreError> {
        match self {
            Self::Memory(kv) => kv.scan(range),
            #[cfg(feature = "rocksdb")]
            Self::RocksDb(kv) => kv.scan(range),
        }
    }

    fn count(&self, range: &KeyRange) -> Result<usize, KVStoreError> {
        match self {
            Self::Memory(kv) => kv.count(range),
            #[cfg(feature = "rocksdb")]
            Self::RocksDb(kv) => kv.count(range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idx_04_persistence::Table;

    #[test]
    fn test_memory_without_data_dir() {
        let mut store = StorageBackend::open(&IndexerConfig::default()).unwrap();
        let mut changes = ChangeSet::new();
        changes.insert(b"state:celestia_indexer".to_vec(), Some(b"row".to_vec()));

        store.commit(changes).unwrap();

        assert_eq!(store.kind(), "memory");
        assert_eq!(store.count(&KeyRange::table(Table::State)).unwrap(), 1);
    }

    #[cfg(feature = "rocksdb")]
    #[test]
    fn test_rocksdb_with_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = IndexerConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let store = StorageBackend::open(&config).unwrap();

        assert_eq!(store.kind(), "rocksdb");
    }
}
