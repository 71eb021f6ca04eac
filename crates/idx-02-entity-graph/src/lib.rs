//! # Entity Graph Subsystem (idx-02)
//!
//! Derives the deduplicated, linked entity graph of one block: shared
//! `Address` and `Namespace` rows plus the `NamespaceMessage` and `TxAddress`
//! junction rows that reference them.
//!
//! ## Pipeline Position
//!
//! ```text
//! Transaction Decoding (1) ──Block──→ Entity Graph (2) ──rows──→ Persistence (4)
//! ```
//!
//! ## Graph Invariants
//!
//! | Invariant | Enforcement | Location |
//! |-----------|-------------|----------|
//! | One `Address` per hash per block | `Arena` keyed by hash | domain/graph.rs |
//! | First namespace toucher owns the row, `pfb_count = 1` | `Arena::get_or_insert_with` | domain/graph.rs |
//! | Duplicate touches produce no junction row | zero resolved identity is skipped | domain/graph.rs |
//! | Junction rows only after identities exist | `GraphError::NotPersisted` | domain/graph.rs |
//!
//! The graph lives for one block only and is dropped after commit or rollback.
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): arena, graph builder, errors
//! - **Ports Layer** (`ports/`): [`EntityStore`], the bulk-save SPI

pub mod domain;
pub mod ports;

pub use domain::{link_transactions, Arena, BlockGraph, GraphError, PersistedCounts};
pub use ports::EntityStore;
