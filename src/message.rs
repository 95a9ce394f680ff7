//! Published message envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header carrying how many times a message has been re-queued.
pub const RETRY_COUNT_HEADER: &str = "x-retry-count";
/// Header carrying the routing key the message was first published with.
pub const ORIGINAL_ROUTING_KEY_HEADER: &str = "x-original-routing-key";
/// Header carrying the scheduled retry delay in milliseconds.
pub const RETRY_DELAY_HEADER: &str = "x-retry-delay";
/// Header carrying why a message was dead-lettered.
pub const DEATH_REASON_HEADER: &str = "x-death-reason";
/// Header carrying when a message was dead-lettered (unix seconds).
pub const DEATH_TIMESTAMP_HEADER: &str = "x-death-timestamp";

/// A message as seen by the router: routing key, opaque payload, headers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    pub routing_key: String,
    #[serde(default)]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,
}

impl Message {
    pub fn new(routing_key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload: payload.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    /// Number of previous delivery attempts, 0 if never retried.
    ///
    /// Accepts integers and numeric strings; anything else counts as 0.
    pub fn retry_count(&self) -> u32 {
        match self.headers.get(RETRY_COUNT_HEADER) {
            Some(Value::Number(n)) => n.as_u64().map_or(0, |v| v.min(u32::MAX as u64) as u32),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Routing key the message was first published with.
    pub fn original_routing_key(&self) -> &str {
        self.headers
            .get(ORIGINAL_ROUTING_KEY_HEADER)
            .and_then(Value::as_str)
            .unwrap_or(&self.routing_key)
    }

    /// The message as it goes back to its source exchange after a retry delay,
    /// with the original routing key restored.
    pub fn for_redelivery(&self) -> Message {
        Message {
            routing_key: self.original_routing_key().to_string(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_count_header() {
        let msg = Message::new("error", "boom");
        assert_eq!(msg.retry_count(), 0);

        let msg = msg.with_header(RETRY_COUNT_HEADER, 2);
        assert_eq!(msg.retry_count(), 2);

        let msg = msg.with_header(RETRY_COUNT_HEADER, "3");
        assert_eq!(msg.retry_count(), 3);

        let msg = msg.with_header(RETRY_COUNT_HEADER, -1);
        assert_eq!(msg.retry_count(), 0);
    }

    #[test]
    fn test_original_routing_key() {
        let msg = Message::new("error", "");
        assert_eq!(msg.original_routing_key(), "error");

        let msg = msg.with_header(ORIGINAL_ROUTING_KEY_HEADER, "auth.error");
        assert_eq!(msg.original_routing_key(), "auth.error");
    }

    #[test]
    fn test_redelivery_restores_key() {
        let parked = Message::new("retry_queue_2s", "body")
            .with_header(ORIGINAL_ROUTING_KEY_HEADER, "error")
            .with_header(RETRY_COUNT_HEADER, 2);

        let redelivered = parked.for_redelivery();
        assert_eq!(redelivered.routing_key, "error");
        assert_eq!(redelivered.retry_count(), 2);
        assert_eq!(redelivered.payload, b"body".to_vec());
    }

    #[test]
    fn test_deserialize_without_payload() {
        let msg: Message = serde_json::from_str(r#"{"routing_key":"a.b"}"#).unwrap();
        assert_eq!(msg.routing_key, "a.b");
        assert!(msg.payload.is_empty());
        assert!(msg.headers.is_empty());
    }
}
