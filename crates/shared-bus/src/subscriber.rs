//! # Notification Subscriber
//!
//! Defines the listening side of the notification bus.

use crate::notification::Notification;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The notifier was dropped.
    #[error("Notifier closed")]
    Closed,
}

/// Keeps the per-channel listener count in sync with live listeners.
pub(crate) struct ListenerGuard {
    listeners: Arc<RwLock<HashMap<String, usize>>>,
    channel: String,
}

impl ListenerGuard {
    pub(crate) fn new(listeners: Arc<RwLock<HashMap<String, usize>>>, channel: String) -> Self {
        Self { listeners, channel }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let Ok(mut listeners) = self.listeners.write() else {
            return;
        };
        let Some(count) = listeners.get_mut(&self.channel) else {
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            listeners.remove(&self.channel);
        }
        debug!(channel = %self.channel, "Notification listener dropped");
    }
}

/// A listener on one channel.
pub struct Subscription {
    receiver: broadcast::Receiver<Notification>,
    guard: ListenerGuard,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<Notification>, guard: ListenerGuard) -> Self {
        Self { receiver, guard }
    }

    pub fn channel(&self) -> &str {
        &self.guard.channel
    }

    /// Receive the next notification of this channel.
    ///
    /// # Returns
    ///
    /// - `Some(notification)` - The next notification on the channel
    /// - `None` - The notifier was dropped
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            let notification = match self.receiver.recv().await {
                Ok(n) => n,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Listener lagged, notifications dropped");
                    continue;
                }
            };

            if notification.channel == self.guard.channel {
                return Some(notification);
            }
        }
    }

    /// Try to receive the next notification without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(notification))` - A notification was available
    /// - `Ok(None)` - Nothing pending
    /// - `Err(SubscriptionError::Closed)` - The notifier was dropped
    pub fn try_recv(&mut self) -> Result<Option<Notification>, SubscriptionError> {
        loop {
            let notification = match self.receiver.try_recv() {
                Ok(n) => n,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if notification.channel == self.guard.channel {
                return Ok(Some(notification));
            }
        }
    }
}

/// A listener on one channel, as an unbounded `Stream`.
pub struct NotificationStream {
    inner: BroadcastStream<Notification>,
    guard: ListenerGuard,
}

impl NotificationStream {
    pub(crate) fn new(receiver: broadcast::Receiver<Notification>, guard: ListenerGuard) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            guard,
        }
    }

    pub fn channel(&self) -> &str {
        &self.guard.channel
    }
}

impl Stream for NotificationStream {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(n)) if n.channel == self.guard.channel => return Poll::Ready(Some(n)),
                Some(Ok(_)) => continue,
                Some(Err(BroadcastStreamRecvError::Lagged(count))) => {
                    debug!(lagged = count, "Stream lagged, notifications dropped");
                    continue;
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::publisher::{InMemoryNotifier, Notifier};
    use crate::{BLOCK_CHANNEL, HEAD_CHANNEL};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_subscription_recv() {
        let notifier = InMemoryNotifier::new();
        let mut sub = notifier.subscribe(BLOCK_CHANNEL);

        notifier.notify(BLOCK_CHANNEL, "1000").await.unwrap();

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("notification");

        assert_eq!(received.channel, BLOCK_CHANNEL);
        assert_eq!(received.payload, "1000");
    }

    #[tokio::test]
    async fn test_subscription_filters_other_channels() {
        let notifier = InMemoryNotifier::new();
        let mut sub = notifier.subscribe(HEAD_CHANNEL);

        notifier.notify(BLOCK_CHANNEL, "1000").await.unwrap();
        notifier.notify(HEAD_CHANNEL, "{\"last_height\":1000}").await.unwrap();

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("notification");

        assert_eq!(received.channel, HEAD_CHANNEL);
        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_lagging_listener_skips_oldest() {
        let notifier = InMemoryNotifier::with_capacity(2);
        let mut sub = notifier.subscribe(BLOCK_CHANNEL);

        for height in 1..=5 {
            notifier.notify(BLOCK_CHANNEL, &height.to_string()).await.unwrap();
        }

        let first = sub.try_recv().unwrap().expect("notification");
        assert_eq!(first.payload, "4");
        let second = sub.try_recv().unwrap().expect("notification");
        assert_eq!(second.payload, "5");
    }

    #[tokio::test]
    async fn test_subscription_drop_cleanup() {
        let notifier = InMemoryNotifier::new();

        {
            let _sub1 = notifier.subscribe(HEAD_CHANNEL);
            let _sub2 = notifier.stream(HEAD_CHANNEL);
            assert_eq!(notifier.listener_count(HEAD_CHANNEL), 2);
        }

        assert_eq!(notifier.listener_count(HEAD_CHANNEL), 0);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_try_recv_closed_after_notifier_dropped() {
        let notifier = InMemoryNotifier::new();
        let mut sub = notifier.subscribe(HEAD_CHANNEL);
        drop(notifier);

        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_yields_channel_notifications() {
        let notifier = InMemoryNotifier::new();
        let mut stream = notifier.stream(BLOCK_CHANNEL);
        assert_eq!(stream.channel(), BLOCK_CHANNEL);

        notifier.notify(HEAD_CHANNEL, "ignored").await.unwrap();
        notifier.notify(BLOCK_CHANNEL, "7").await.unwrap();
        notifier.notify(BLOCK_CHANNEL, "8").await.unwrap();

        let first = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("notification");
        let second = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("notification");

        assert_eq!(first.payload, "7");
        assert_eq!(second.payload, "8");
    }
}
