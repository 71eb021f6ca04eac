//! # Shared Types Crate
//!
//! Entity rows, message kinds and the storage error shared by every indexer
//! subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every row written by ingestion is defined here.
//! - **Identity 0 means unset**: storage assigns identities starting at 1, so a
//!   zero `id` marks an entity that has not been persisted (or was a batch-local
//!   duplicate).
//! - **Closed message set**: message payloads are a closed enum, each variant
//!   exposing its references through [`MessageRefs`].

pub mod decimal;
pub mod entities;
pub mod errors;
pub mod messages;

pub use entities::*;
pub use errors::*;
pub use messages::*;
