//! # Notifications
//!
//! The unit of change notification: a channel name plus an opaque payload.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Channel carrying the indexer state after every committed block.
pub const HEAD_CHANNEL: &str = "head";

/// Channel carrying the height of every committed block.
pub const BLOCK_CHANNEL: &str = "block";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: String,
    pub payload: String,
}

impl Notification {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// A notification whose payload is `value` encoded as JSON.
    ///
    /// # Errors
    ///
    /// `NotifyError::Payload` when `value` has no JSON form.
    pub fn json<T: Serialize>(channel: impl Into<String>, value: &T) -> Result<Self, NotifyError> {
        let payload =
            serde_json::to_string(value).map_err(|e| NotifyError::Payload(e.to_string()))?;
        Ok(Self::new(channel, payload))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("invalid notification channel: {0:?}")]
    InvalidChannel(String),

    #[error("cannot encode notification payload: {0}")]
    Payload(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Head {
        last_height: u64,
    }

    #[test]
    fn test_json_payload() {
        let notification = Notification::json(HEAD_CHANNEL, &Head { last_height: 1000 }).unwrap();

        assert_eq!(notification.channel, "head");
        assert_eq!(notification.payload, r#"{"last_height":1000}"#);
    }

    #[test]
    fn test_unencodable_value_is_payload_error() {
        // JSON object keys must be strings
        let mut value = BTreeMap::new();
        value.insert(vec![1u8, 2], 3u8);

        let err = Notification::json(HEAD_CHANNEL, &value).unwrap_err();

        assert!(matches!(err, NotifyError::Payload(_)));
    }
}
