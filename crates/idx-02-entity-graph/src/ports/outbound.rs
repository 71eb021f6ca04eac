//! # Outbound Ports (Driven Ports)
//!
//! Storage the graph needs in order to hand out durable identities.
//! Implemented by the persistence subsystem's storage transaction.

use async_trait::async_trait;
use shared_types::{Address, Namespace, StoreError};

/// Bulk upsert of the graph's shared entities.
///
/// Both calls write the assigned identity back into every entity and return
/// how many rows did not exist before.
#[async_trait]
pub trait EntityStore: Send {
    /// Upsert addresses by hash.
    async fn save_addresses(&mut self, addresses: &mut [Address]) -> Result<u64, StoreError>;

    /// Upsert namespaces by `(version, id)`.
    async fn save_namespaces(&mut self, namespaces: &mut [Namespace]) -> Result<u64, StoreError>;
}
