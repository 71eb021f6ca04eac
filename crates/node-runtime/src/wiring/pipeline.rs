//! # Ingestion Pipeline
//!
//! Builds the linear chain of stages from a [`SubsystemContainer`], starts
//! them with one shared shutdown signal and waits for them to drain.
//!
//! Within a block the stages run strictly one after another; across blocks
//! the channels let decoding of block `n + 1` overlap the commit of block
//! `n`, while commits themselves stay single-flight.

use crate::adapters::BlockSource;
use crate::container::SubsystemContainer;
use crate::handlers::{DecodeStage, NotifyStage, SourceStage, StorageStage, Stopper};
use crate::wiring::module::{Module, PipelineError};
use crate::wiring::ports::{attach, Input, Output};
use idx_04_persistence::KeyValueStore;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

pub struct IndexerPipeline {
    /// In flow order, source first.
    modules: Vec<Box<dyn Module>>,
    stopper: Stopper,
    shutdown: Arc<watch::Sender<bool>>,
}

fn connect<T: Clone + Send>(output: Option<&mut Output<T>>, input: Option<&mut Input<T>>) {
    if let (Some(output), Some(input)) = (output, input) {
        attach(output, input);
    }
}

impl IndexerPipeline {
    pub fn build<K, S>(container: &SubsystemContainer<K>, source: S) -> Self
    where
        K: KeyValueStore + 'static,
        S: BlockSource + 'static,
    {
        let config = &container.config;
        let capacity = config.channel_capacity;
        let (shutdown, _) = watch::channel(false);
        let shutdown = Arc::new(shutdown);

        let mut source = SourceStage::new(source).resume_after(container.resume_after);
        let mut decode = DecodeStage::new(container.decoder.clone(), capacity);
        let mut storage = StorageStage::new(
            Arc::clone(&container.coordinator),
            capacity,
            config.max_retries,
            config.retry_delay(),
        );
        let mut notify = NotifyStage::new(container.notifier.clone(), capacity);
        let mut stopper = Stopper::new(Arc::clone(&shutdown));

        connect(source.blocks(), decode.envelopes());
        connect(decode.blocks(), storage.blocks());
        connect(storage.committed(), notify.committed());
        connect(decode.halt(), stopper.signal());
        connect(storage.halt(), stopper.signal());

        Self {
            modules: vec![
                Box::new(source),
                Box::new(decode),
                Box::new(storage),
                Box::new(notify),
            ],
            stopper,
            shutdown,
        }
    }

    /// A new output wired to the stopper. Call before [`start`](Self::start).
    pub fn signal(&mut self) -> Output<()> {
        let mut output = Output::new("signal");
        connect(Some(&mut output), self.stopper.signal());
        output
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Raises the shutdown signal directly.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Starts the stopper, then the stages from the sink back to the source.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        self.stopper.start(self.shutdown.subscribe())?;
        for module in self.modules.iter_mut().rev() {
            module.start(self.shutdown.subscribe())?;
        }
        info!(modules = self.modules.len(), "[runtime] pipeline started");
        Ok(())
    }

    /// Waits for every stage to exit, source first, then stops the stopper.
    ///
    /// Returns the first stage error, if any.
    pub async fn wait(mut self) -> Result<(), PipelineError> {
        let mut first_error = None;
        for module in self.modules.iter_mut() {
            if let Err(err) = module.close().await {
                error!(module = module.name(), error = %err, "[runtime] stage failed");
                first_error.get_or_insert(err);
            }
        }

        self.shutdown.send_replace(true);
        self.stopper.close().await?;
        info!("[runtime] pipeline stopped");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
