//! # Shared Bus - Change Notification
//!
//! Publishes post-commit notifications to any number of listeners.
//!
//! ```text
//! ┌──────────────┐  notify(channel, payload)  ┌──────────────────┐
//! │  Ingestion   │ ─────────────────────────► │ InMemoryNotifier │
//! └──────────────┘                            └────────┬─────────┘
//!                                   subscribe(channel) │
//!                              ┌───────────────────────┼────────────┐
//!                              ▼                       ▼            ▼
//!                        Subscription         NotificationStream   ...
//! ```
//!
//! ## Delivery
//!
//! - **Best effort:** publishing never waits for listeners and never fails
//!   because nobody is listening.
//! - **Lagging listeners skip:** a listener that falls more than the channel
//!   capacity behind loses the oldest notifications and keeps going.
//! - **Decoupled from storage:** a failed notification never undoes a commit.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod notification;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use notification::{Notification, NotifyError, BLOCK_CHANNEL, HEAD_CHANNEL};
pub use publisher::{InMemoryNotifier, Notifier};
pub use subscriber::{NotificationStream, Subscription, SubscriptionError};

/// Notifications buffered per listener before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
