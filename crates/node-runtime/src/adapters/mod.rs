//! # Adapter Implementations
//!
//! Concrete implementations at the edges of the pipeline:
//!
//! 1. **Block sources** feeding envelopes into the decode stage
//! 2. **Storage backend** behind the persistence coordinator
//!
//! ```text
//! BlockSource ──→ [ pipeline ] ──→ StorageBackend (memory | rocksdb)
//! ```

pub mod source;
pub mod storage;

pub use source::{BlockSource, JsonLinesSource, SourceError, VecSource};
pub use storage::StorageBackend;
