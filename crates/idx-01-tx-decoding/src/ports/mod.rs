//! Ports for transaction decoding.

pub mod inbound;

pub use inbound::BlockDecoder;
