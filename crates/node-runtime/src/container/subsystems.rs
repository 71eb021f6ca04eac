//! # Subsystem Container
//!
//! Holds the subsystem instances shared by the pipeline stages.
//!
//! ## Initialization Order
//!
//! ```text
//! 1. Decoder (idx-01)        stateless
//! 2. Coordinator (idx-04)    rebuilds the validator index from storage
//! 3. Notifier (shared-bus)   post-commit change bus
//! ```
//!
//! ## Thread Safety
//!
//! - Stateless services are shared through `Arc`
//! - The coordinator sits behind an async `Mutex`: one block transaction at
//!   a time, held across the commit's suspension points

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use idx_01_tx_decoding::DecodingService;
use idx_04_persistence::{KeyValueStore, PersistenceCoordinator, PersistenceError};
use shared_bus::InMemoryNotifier;

use crate::container::config::IndexerConfig;

/// The coordinator as shared with the storage stage.
pub type SharedCoordinator<K> = Arc<Mutex<PersistenceCoordinator<K>>>;

pub struct SubsystemContainer<K: KeyValueStore> {
    pub config: IndexerConfig,

    /// Transaction Decoding (idx-01)
    pub decoder: Arc<DecodingService>,

    /// Entity graph, validator lifecycle and persistence (idx-02..04)
    pub coordinator: SharedCoordinator<K>,

    /// Change notifications
    pub notifier: Arc<InMemoryNotifier>,

    /// Last committed height when the container was built.
    pub resume_after: Option<u64>,
}

impl<K: KeyValueStore> SubsystemContainer<K> {
    pub fn new(config: IndexerConfig, kv: K) -> Result<Self, PersistenceError> {
        let decoder = Arc::new(DecodingService::new(config.decoder()));

        let coordinator = PersistenceCoordinator::new(kv, config.coordinator())?;
        let resume_after = coordinator.last_height()?;

        let notifier = Arc::new(InMemoryNotifier::new());

        info!(
            indexer = %config.indexer_name,
            resume_after = ?resume_after,
            validators = coordinator.index().len(),
            "[runtime] subsystems initialized"
        );

        Ok(Self {
            config,
            decoder,
            coordinator: Arc::new(Mutex::new(coordinator)),
            notifier,
            resume_after,
        })
    }
}
