//! Notify stage: publishes committed heads on the change bus.
//!
//! Best effort. A failed notification is logged and never affects the
//! commit it reports.

use crate::wiring::module::{stopped, Worker};
use crate::wiring::{Input, Module, PipelineError};
use async_trait::async_trait;
use idx_04_persistence::CommitReport;
use shared_bus::{Notification, Notifier, BLOCK_CHANNEL, HEAD_CHANNEL};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct NotifyStage {
    worker: Worker<NotifyWorker>,
}

struct NotifyWorker {
    notifier: Arc<dyn Notifier>,
    committed: Input<CommitReport>,
}

impl NotifyStage {
    pub const NAME: &'static str = "notify";

    pub fn new(notifier: Arc<dyn Notifier>, capacity: usize) -> Self {
        Self {
            worker: Worker::new(
                Self::NAME,
                NotifyWorker {
                    notifier,
                    committed: Input::new("committed", capacity),
                },
            ),
        }
    }

    pub fn committed(&mut self) -> Option<&mut Input<CommitReport>> {
        self.worker.state_mut().map(|s| &mut s.committed)
    }
}

impl NotifyWorker {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        loop {
            let report = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                report = self.committed.recv() => match report {
                    Some(report) => report,
                    None => break,
                },
            };
            self.publish(&report).await;
        }
        info!("[runtime] notify stage exited");
        Ok(())
    }

    async fn publish(&self, report: &CommitReport) {
        match Notification::json(HEAD_CHANNEL, &report.state) {
            Ok(head) => self.send(&head, report.height).await,
            Err(err) => {
                warn!(height = report.height, error = %err, "[runtime] notification failed")
            }
        }
        let block = Notification::new(BLOCK_CHANNEL, report.height.to_string());
        self.send(&block, report.height).await;
    }

    async fn send(&self, notification: &Notification, height: u64) {
        let channel = notification.channel.as_str();
        match self.notifier.notify(channel, &notification.payload).await {
            Ok(listeners) => debug!(channel, height, listeners, "[runtime] notified"),
            Err(err) => warn!(channel, height, error = %err, "[runtime] notification failed"),
        }
    }
}

#[async_trait]
impl Module for NotifyStage {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiring::{attach, Output};
    use shared_bus::{InMemoryNotifier, NotifyError};
    use shared_types::State;
    use std::sync::atomic::{AtomicU64, Ordering};

    // ===== TEST HELPERS =====

    fn make_report(height: u64) -> CommitReport {
        CommitReport {
            height,
            state: State {
                id: 1,
                name: "celestia_indexer".to_string(),
                last_height: height,
                ..Default::default()
            },
            new_addresses: 0,
            new_namespaces: 0,
            validators_written: 0,
            rows_written: 0,
            elapsed_ms: 0,
        }
    }

    /// Rejects every notification.
    #[derive(Default)]
    struct RejectingNotifier {
        attempts: AtomicU64,
    }

    #[async_trait]
    impl Notifier for RejectingNotifier {
        async fn notify(&self, channel: &str, _payload: &str) -> Result<usize, NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::InvalidChannel(channel.to_string()))
        }

        fn notifications_sent(&self) -> u64 {
            0
        }
    }

    async fn run_stage(notifier: Arc<dyn Notifier>, reports: Vec<CommitReport>) {
        let mut stage = NotifyStage::new(notifier, 4);
        let mut output = Output::new("committed");
        if let Some(input) = stage.committed() {
            attach(&mut output, input);
        }
        let (_shutdown, rx) = watch::channel(false);
        stage.start(rx).unwrap();

        for report in reports {
            assert_eq!(output.push(report).await, 1);
        }
        drop(output);

        stage.close().await.unwrap();
    }

    // ===== PUBLISHING =====

    #[tokio::test]
    async fn test_commit_published_on_head_and_block() {
        // Arrange
        let notifier = Arc::new(InMemoryNotifier::new());
        let mut head = notifier.subscribe(HEAD_CHANNEL);
        let mut block = notifier.subscribe(BLOCK_CHANNEL);

        // Act
        run_stage(notifier.clone(), vec![make_report(1000)]).await;

        // Assert
        let head = head.try_recv().unwrap().unwrap();
        let state: State = serde_json::from_str(&head.payload).unwrap();
        assert_eq!(state.last_height, 1000);
        assert_eq!(block.try_recv().unwrap().unwrap().payload, "1000");
    }

    #[tokio::test]
    async fn test_failed_notification_does_not_stop_stage() {
        let notifier = Arc::new(RejectingNotifier::default());

        run_stage(notifier.clone(), vec![make_report(1), make_report(2)]).await;

        // head and block for each report
        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 4);
    }
}
