//! # Subsystem Container
//!
//! Configuration and the subsystem instances the pipeline is built from.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, IndexerConfig};
pub use subsystems::{SharedCoordinator, SubsystemContainer};
