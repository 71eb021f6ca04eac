//! # Notification Publisher
//!
//! Defines the publishing side of the notification bus.

use crate::notification::{Notification, NotifyError};
use crate::subscriber::{ListenerGuard, NotificationStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

/// Fire-and-forget publishing of change notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish `payload` on `channel`.
    ///
    /// # Returns
    ///
    /// The number of active listeners the notification was handed to. Zero
    /// listeners is not an error.
    async fn notify(&self, channel: &str, payload: &str) -> Result<usize, NotifyError>;

    /// Total notifications accepted for publishing.
    fn notifications_sent(&self) -> u64;
}

/// In-memory notifier on top of `tokio::sync::broadcast`.
///
/// Every listener sees every notification of its channel, unless it lags
/// behind by more than the channel capacity.
pub struct InMemoryNotifier {
    sender: broadcast::Sender<Notification>,

    /// Active listener count by channel.
    listeners: Arc<RwLock<HashMap<String, usize>>>,

    sent: AtomicU64,

    capacity: usize,
}

impl InMemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            listeners: Arc::new(RwLock::new(HashMap::new())),
            sent: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to one channel.
    ///
    /// Only notifications published after this call are observed.
    #[must_use]
    pub fn subscribe(&self, channel: &str) -> Subscription {
        debug!(channel, "New notification listener");
        Subscription::new(self.sender.subscribe(), self.guard(channel))
    }

    /// Subscribe to one channel as a `Stream`.
    #[must_use]
    pub fn stream(&self, channel: &str) -> NotificationStream {
        NotificationStream::new(self.sender.subscribe(), self.guard(channel))
    }

    /// Number of live listeners on `channel`.
    #[must_use]
    pub fn listener_count(&self, channel: &str) -> usize {
        self.listeners
            .read()
            .map(|l| l.get(channel).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of live listeners across all channels.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn guard(&self, channel: &str) -> ListenerGuard {
        if let Ok(mut listeners) = self.listeners.write() {
            *listeners.entry(channel.to_string()).or_insert(0) += 1;
        }
        ListenerGuard::new(self.listeners.clone(), channel.to_string())
    }
}

impl Default for InMemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, channel: &str, payload: &str) -> Result<usize, NotifyError> {
        if channel.is_empty() {
            return Err(NotifyError::InvalidChannel(channel.to_string()));
        }

        self.sent.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(Notification::new(channel, payload)) {
            Ok(receivers) => {
                debug!(channel, receivers, "Notification published");
                Ok(receivers)
            }
            Err(_) => {
                debug!(channel, "Notification dropped (no listeners)");
                Ok(0)
            }
        }
    }

    fn notifications_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}
