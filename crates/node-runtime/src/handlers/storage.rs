//! Storage stage: commits each block through the persistence coordinator
//! (idx-02 → idx-03 → idx-04).
//!
//! Retryable failures (storage I/O) are retried from the same block up to
//! `max_retries` times; fatal failures, or retries running out, halt the
//! pipeline. A block is never skipped.

use crate::container::SharedCoordinator;
use crate::wiring::module::{stopped, Worker};
use crate::wiring::{Input, Module, Output, PipelineError};
use async_trait::async_trait;
use idx_04_persistence::{CommitReport, KeyValueStore, PersistenceError};
use shared_types::{Block, Classify};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct StorageStage<K: KeyValueStore> {
    worker: Worker<StorageWorker<K>>,
}

struct StorageWorker<K: KeyValueStore> {
    coordinator: SharedCoordinator<K>,
    blocks: Input<Block>,
    committed: Output<CommitReport>,
    halt: Output<()>,
    max_retries: u32,
    retry_delay: Duration,
}

impl<K: KeyValueStore + 'static> StorageStage<K> {
    pub const NAME: &'static str = "storage";

    pub fn new(
        coordinator: SharedCoordinator<K>,
        capacity: usize,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            worker: Worker::new(
                Self::NAME,
                StorageWorker {
                    coordinator,
                    blocks: Input::new("blocks", capacity),
                    committed: Output::new("committed"),
                    halt: Output::new("halt"),
                    max_retries,
                    retry_delay,
                },
            ),
        }
    }

    pub fn blocks(&mut self) -> Option<&mut Input<Block>> {
        self.worker.state_mut().map(|s| &mut s.blocks)
    }

    pub fn committed(&mut self) -> Option<&mut Output<CommitReport>> {
        self.worker.state_mut().map(|s| &mut s.committed)
    }

    /// Signalled when a block cannot be committed.
    pub fn halt(&mut self) -> Option<&mut Output<()>> {
        self.worker.state_mut().map(|s| &mut s.halt)
    }
}

impl<K: KeyValueStore + 'static> StorageWorker<K> {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        loop {
            let block = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                block = self.blocks.recv() => match block {
                    Some(block) => block,
                    None => break,
                },
            };

            match self.commit(&block).await {
                Ok(report) => {
                    self.committed.push(report).await;
                }
                Err(err) => {
                    error!(height = block.height, error = %err, "[idx-04] pipeline halted");
                    self.halt.push(()).await;
                    return Err(PipelineError::Halted {
                        module: StorageStage::<K>::NAME,
                        height: block.height,
                        reason: err.to_string(),
                    });
                }
            }
        }
        info!("[idx-04] storage stage exited");
        Ok(())
    }

    async fn commit(&self, block: &Block) -> Result<CommitReport, PersistenceError> {
        let mut attempt = 0;
        loop {
            let result = self.coordinator.lock().await.commit(block).await;
            match result {
                Err(err) if !err.is_fatal() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        height = block.height,
                        attempt,
                        error = %err,
                        "[idx-04] retrying block"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<K: KeyValueStore + 'static> Module for StorageStage<K> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn start(&mut self, shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        self.worker.spawn(|worker| worker.run(shutdown))
    }

    async fn close(&mut self) -> Result<(), PipelineError> {
        self.worker.join().await
    }
}
