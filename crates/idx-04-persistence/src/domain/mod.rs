//! Domain layer for persistence: key layout, partitions, errors.

pub mod errors;
pub mod keys;
pub mod partition;

pub use errors::{KVStoreError, PersistenceError};
pub use keys::{KeyRange, Table};
pub use partition::{Partition, PartitionPeriod, PARTITIONED_TABLES};
