//! # Persistence Subsystem (idx-04)
//!
//! Commits each block and everything derived from it in one atomic write:
//! block and stats rows, transactions, messages, events, addresses,
//! namespaces, junction rows, validator side effects and the indexer state.
//!
//! ## Commit Pipeline
//!
//! ```text
//! Block ──→ BlockGraph::collect ──→ StorageTransaction (staged)
//!                                       │
//!            rows, entities, junctions, validators, state
//!                                       │
//!                      ┌────────────────┴────────────────┐
//!                   flush()                          rollback()
//!             one atomic batch                   nothing visible
//!                      │
//!         ValidatorIndex::apply(pending)
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement | Location |
//! |-----------|-------------|----------|
//! | All rows of a block commit or none do | staged writes, one `commit` | transaction.rs |
//! | One transaction per store | `begin()` borrows the store mutably | transaction.rs |
//! | Partitioned rows need a registered partition | `partition_for` | transaction.rs |
//! | Heights are contiguous | `PersistenceError::HeightGap` | service.rs |
//! | Validator index reflects committed rows only | index applied after flush | service.rs |
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): key layout, partitions, errors
//! - **Ports Layer** (`ports/`): [`KeyValueStore`]
//! - **Adapters** (`adapters/`): in-memory store, RocksDB (feature `rocksdb`)
//! - **Service** (`service.rs`): [`PersistenceCoordinator`]

pub mod adapters;
mod codec;
pub mod domain;
pub mod ports;
pub mod reader;
pub mod service;
pub mod transaction;

pub use adapters::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::{KVStoreError, KeyRange, Partition, PartitionPeriod, PersistenceError, Table};
pub use ports::{ChangeSet, KeyValueStore, ScanResult};
pub use reader::StorageReader;
pub use service::{CommitReport, CoordinatorConfig, PersistenceCoordinator};
pub use transaction::{Record, StorageTransaction, Transactable};
