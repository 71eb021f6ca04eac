//! # RocksDB Storage Adapter
//!
//! One `WriteBatch` per committed block. Range scans set the iterator's
//! upper bound from the [`KeyRange`], so a table scan never walks into the
//! next table's keys. Bloom filters serve the point lookups on the identity
//! indexes (`address_hash`, `namespace_key`, `validator_address`).

use crate::domain::keys::KeyRange;
use crate::domain::KVStoreError;
use crate::ports::{ChangeSet, KeyValueStore, ScanResult};
use rocksdb::{
    BlockBasedOptions, Cache, DBCompressionType, Direction, IteratorMode, Options, ReadOptions,
    WriteBatch, WriteOptions, DB,
};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    pub path: PathBuf,
    /// Block cache in bytes (default: 256MB)
    pub block_cache_size: usize,
    /// Memtable size in bytes (default: 64MB)
    pub write_buffer_size: usize,
    /// fsync every block commit (default: true)
    pub sync_commits: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/indexer"),
            block_cache_size: 256 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            sync_commits: true,
        }
    }
}

impl RocksDbConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

pub struct RocksDbStore {
    db: DB,
    sync_commits: bool,
}

fn io_error(during: &str, e: rocksdb::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: format!("RocksDB {} failed: {}", during, e),
    }
}

impl RocksDbStore {
    /// Opens or creates the database at `config.path`.
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(DBCompressionType::Snappy);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| io_error("open", e))?;
        Ok(Self {
            db,
            sync_commits: config.sync_commits,
        })
    }

    fn range_iter(&self, range: &KeyRange) -> rocksdb::DBIterator<'_> {
        let mut read_opts = ReadOptions::default();
        if let Some(end) = range.end() {
            read_opts.set_iterate_upper_bound(end.to_vec());
        }
        self.db.iterator_opt(
            IteratorMode::From(range.start(), Direction::Forward),
            read_opts,
        )
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.db.get(key).map_err(|e| io_error("get", e))
    }

    fn contains(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        self.db
            .get_pinned(key)
            .map(|v| v.is_some())
            .map_err(|e| io_error("lookup", e))
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<(), KVStoreError> {
        let mut batch = WriteBatch::default();
        for (key, value) in changes {
            match value {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_commits);
        self.db
            .write_opt(batch, &write_opts)
            .map_err(|e| io_error("commit", e))
    }

    fn scan(&self, range: &KeyRange) -> Result<ScanResult, KVStoreError> {
        self.range_iter(range)
            .map(|item| {
                item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(|e| io_error("scan", e))
            })
            .collect()
    }

    fn count(&self, range: &KeyRange) -> Result<usize, KVStoreError> {
        let mut rows = 0;
        for item in self.range_iter(range) {
            item.map_err(|e| io_error("count", e))?;
            rows += 1;
        }
        Ok(rows)
    }
}
