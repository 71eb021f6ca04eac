//! Ctrl-C listener feeding the stopper.

use crate::wiring::module::stopped;
use crate::wiring::ports::Output;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Pushes onto `signal` when Ctrl-C is received. Exits quietly once
/// `shutdown` is raised by anything else.
pub fn spawn_signal_listener(
    mut signal: Output<()>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = stopped(&mut shutdown) => {}
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("[runtime] ctrl-c received");
                    signal.push(()).await;
                }
                Err(err) => warn!(error = %err, "[runtime] cannot listen for ctrl-c"),
            },
        }
    })
}
