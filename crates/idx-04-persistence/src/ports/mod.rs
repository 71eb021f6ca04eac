//! Port definitions for the persistence subsystem.

pub mod outbound;

pub use outbound::{ChangeSet, KeyValueStore, ScanResult};
