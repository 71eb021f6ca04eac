//! Ports for the entity graph.

pub mod outbound;

pub use outbound::EntityStore;
