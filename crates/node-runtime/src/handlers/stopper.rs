//! Stopper: turns a signal on its input into pipeline-wide shutdown.

use crate::wiring::module::{stopped, Worker};
use crate::wiring::{Input, Module, PipelineError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

pub struct Stopper {
    worker: Worker<StopperWorker>,
}

struct StopperWorker {
    signal: Input<()>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Stopper {
    pub const NAME: &'static str = "stopper";

    pub fn new(shutdown: Arc<watch::Sender<bool>>) -> Self {
        Self {
            worker: Worker::new(
                Self::NAME,
                StopperWorker {
                    signal: Input::new("signal", 1),
                    shutdown,
                },
            ),
        }
    }

    pub fn signal(&mut self) -> Option<&mut Input<()>> {
        self.worker.state_mut().map(|s| &mut s.signal)
    }
}

impl StopperWorker {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => {}
            signal = self.signal.recv() => {
                if signal.is_some() {
                    info!("[runtime] stop signal received");
                    self.shutdown.send_replace(true);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Module for Stopper {
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
