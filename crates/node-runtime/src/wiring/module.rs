//! # Pipeline Modules
//!
//! Every stage is a [`Module`]: started with the shared shutdown signal, it
//! runs its loop on a spawned task; `close()` waits for that task to drain.

use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("module {module} already started")]
    AlreadyStarted { module: &'static str },

    /// A stage stopped on an error the pipeline cannot get past.
    #[error("{module} halted at height {height}: {reason}")]
    Halted {
        module: &'static str,
        height: u64,
        reason: String,
    },

    #[error("{module} source failed: {reason}")]
    Source { module: &'static str, reason: String },

    #[error("{module} task failed: {reason}")]
    Task { module: &'static str, reason: String },
}

/// A pipeline stage.
#[async_trait]
pub trait Module: Send {
    fn name(&self) -> &'static str;

    /// Spawns the module's loop. It exits once `shutdown` turns true or its
    /// input is closed, after finishing the item in flight.
    fn start(&mut self, shutdown: watch::Receiver<bool>) -> Result<(), PipelineError>;

    /// Waits for the loop to exit and returns how it ended.
    async fn close(&mut self) -> Result<(), PipelineError>;
}

/// Task bookkeeping shared by every module.
pub(crate) struct Worker<W> {
    module: &'static str,
    state: Option<W>,
    task: Option<JoinHandle<Result<(), PipelineError>>>,
}

impl<W: Send + 'static> Worker<W> {
    pub(crate) fn new(module: &'static str, state: W) -> Self {
        Self {
            module,
            state: Some(state),
            task: None,
        }
    }

    /// State before start, for attaching ports.
    pub(crate) fn state_mut(&mut self) -> Option<&mut W> {
        self.state.as_mut()
    }

    pub(crate) fn spawn<F, Fut>(&mut self, run: F) -> Result<(), PipelineError>
    where
        F: FnOnce(W) -> Fut,
        Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
    {
        let state = self.state.take().ok_or(PipelineError::AlreadyStarted {
            module: self.module,
        })?;
        self.task = Some(tokio::spawn(run(state)));
        Ok(())
    }

    pub(crate) async fn join(&mut self) -> Result<(), PipelineError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.await.map_err(|e| PipelineError::Task {
            module: self.module,
            reason: e.to_string(),
        })?
    }
}

/// Waits until the shutdown flag is raised. A dropped sender counts as
/// shutdown.
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
