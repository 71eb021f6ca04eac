//! Source stage: pulls envelopes from a [`BlockSource`] into the pipeline.

use crate::adapters::BlockSource;
use crate::wiring::module::{stopped, Worker};
use crate::wiring::{Module, Output, PipelineError};
use async_trait::async_trait;
use idx_01_tx_decoding::BlockEnvelope;
use tokio::sync::watch;
use tracing::{debug, info};

pub struct SourceStage<S> {
    worker: Worker<SourceWorker<S>>,
}

struct SourceWorker<S> {
    source: S,
    blocks: Output<BlockEnvelope>,
    resume_after: Option<u64>,
}

impl<S: BlockSource + 'static> SourceStage<S> {
    pub const NAME: &'static str = "source";

    pub fn new(source: S) -> Self {
        Self {
            worker: Worker::new(
                Self::NAME,
                SourceWorker {
                    source,
                    blocks: Output::new("blocks"),
                    resume_after: None,
                },
            ),
        }
    }

    /// Skips envelopes at or below `height`, already committed by an
    /// earlier run.
    pub fn resume_after(mut self, height: Option<u64>) -> Self {
        if let Some(state) = self.worker.state_mut() {
            state.resume_after = height;
        }
        self
    }

    pub fn blocks(&mut self) -> Option<&mut Output<BlockEnvelope>> {
        self.worker.state_mut().map(|s| &mut s.blocks)
    }
}

impl<S: BlockSource + 'static> SourceWorker<S> {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                next = self.source.next_block() => next,
            };

            let envelope = match next {
                Ok(Some(envelope)) => envelope,
                Ok(None) => {
                    info!("[runtime] block source exhausted");
                    break;
                }
                Err(err) => {
                    return Err(PipelineError::Source {
                        module: SourceStage::<S>::NAME,
                        reason: err.to_string(),
                    })
                }
            };

            if self.resume_after.is_some_and(|h| envelope.height <= h) {
                debug!(height = envelope.height, "[runtime] skipping committed block");
                continue;
            }
            if self.blocks.push(envelope).await == 0 {
                break;
            }
        }
        info!("[runtime] source stage exited");
        Ok(())
    }
}

#[async_trait]
impl<S: BlockSource + 'static> Module for SourceStage<S> {
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
