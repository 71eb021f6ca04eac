//! # Pipeline Wiring
//!
//! Typed ports, the module contract and the assembled ingestion pipeline.
//!
//! ## Flow
//!
//! ```text
//! ┌────────┐   ┌────────┐   ┌─────────┐   ┌────────┐
//! │ source │──→│ decode │──→│ storage │──→│ notify │
//! └────────┘   └───┬────┘   └────┬────┘   └────────┘
//!                  │ halt        │ halt
//!                  ▼             ▼
//!             ┌──────────────────────┐        ctrl-c
//!             │       stopper        │◄────── listener
//!             └──────────┬───────────┘
//!                        ▼
//!                 shutdown (watch)
//! ```

pub mod module;
pub mod pipeline;
pub mod ports;
pub mod signal;

pub use module::{Module, PipelineError};
pub use pipeline::IndexerPipeline;
pub use ports::{attach, Input, Output};
pub use signal::spawn_signal_listener;
