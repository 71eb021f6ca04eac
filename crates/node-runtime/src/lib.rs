//! # Node Runtime Library
//!
//! This library exposes the internal modules of the indexer runtime for
//! testing. The main entry point is the `main.rs` binary.
//!
//! ## Architectural Patterns
//!
//! - **Pipeline of modules**: each stage runs on its own task between typed ports
//! - **Hexagonal Architecture**: subsystems define ports, the runtime supplies adapters
//! - **Single-flight commits**: one block transaction at a time per indexer

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod wiring;

pub use adapters::{BlockSource, JsonLinesSource, SourceError, StorageBackend, VecSource};
pub use container::{ConfigError, IndexerConfig, SubsystemContainer};
pub use wiring::{spawn_signal_listener, IndexerPipeline, Module, PipelineError};
