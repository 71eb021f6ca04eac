//! Decode stage: envelope → typed block (idx-01).

use crate::wiring::module::{stopped, Worker};
use crate::wiring::{Input, Module, Output, PipelineError};
use async_trait::async_trait;
use idx_01_tx_decoding::{BlockDecoder, BlockEnvelope};
use shared_types::Block;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub struct DecodeStage {
    worker: Worker<DecodeWorker>,
}

struct DecodeWorker {
    decoder: Arc<dyn BlockDecoder>,
    envelopes: Input<BlockEnvelope>,
    blocks: Output<Block>,
    halt: Output<()>,
}

impl DecodeStage {
    pub const NAME: &'static str = "decode";

    pub fn new(decoder: Arc<dyn BlockDecoder>, capacity: usize) -> Self {
        Self {
            worker: Worker::new(
                Self::NAME,
                DecodeWorker {
                    decoder,
                    envelopes: Input::new("envelopes", capacity),
                    blocks: Output::new("blocks"),
                    halt: Output::new("halt"),
                },
            ),
        }
    }

    pub fn envelopes(&mut self) -> Option<&mut Input<BlockEnvelope>> {
        self.worker.state_mut().map(|s| &mut s.envelopes)
    }

    pub fn blocks(&mut self) -> Option<&mut Output<Block>> {
        self.worker.state_mut().map(|s| &mut s.blocks)
    }

    /// Signalled when a block cannot be decoded.
    pub fn halt(&mut self) -> Option<&mut Output<()>> {
        self.worker.state_mut().map(|s| &mut s.halt)
    }
}

impl DecodeWorker {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        loop {
            let envelope = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                envelope = self.envelopes.recv() => match envelope {
                    Some(envelope) => envelope,
                    None => break,
                },
            };

            let height = envelope.height;
            match self.decoder.decode_block(envelope) {
                Ok(block) => {
                    debug!(height, txs = block.txs.len(), "[idx-01] block decoded");
                    if self.blocks.push(block).await == 0 {
                        break;
                    }
                }
                Err(err) => {
                    error!(height, error = %err, "[idx-01] block rejected");
                    self.halt.push(()).await;
                    return Err(PipelineError::Halted {
                        module: DecodeStage::NAME,
                        height,
                        reason: err.to_string(),
                    });
                }
            }
        }
        info!("[idx-01] decode stage exited");
        Ok(())
    }
}

#[async_trait]
impl Module for DecodeStage {
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
