//! Domain layer for the entity graph.

pub mod arena;
pub mod errors;
pub mod graph;

pub use arena::Arena;
pub use errors::GraphError;
pub use graph::{link_transactions, BlockGraph, PersistedCounts};
