//! Retry and dead-letter planning.
//!
//! # Responsibilities
//! - Decide whether a failed delivery is retried or dead-lettered
//! - Compute the retry delay and stamp retry headers
//! - Stamp dead-letter headers (reason, timestamp, original key)
//! - Declare the retry and dead-letter exchanges for a source exchange
//! - Bind the per-delay holding queue a retry is parked in
//!
//! # Design Decisions
//! - Permanent failures skip retries and go straight to the dead-letter exchange
//! - Retry count travels in the `x-retry-count` header, not in local state
//! - Retry and dead-letter exchanges are direct, keyed by the original routing key
//! - Holding queues are named by delay (`retry_queue_<secs>s`) and bound under
//!   their own name, so a retry lands in exactly one of them
//! - A parked message is published with the holding queue as routing key; the
//!   original key rides in `x-original-routing-key` and is restored on redelivery
//! - The planner only decides; the transport performs the publish

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::RetryConfig;
use crate::message::{
    Message, DEATH_REASON_HEADER, DEATH_TIMESTAMP_HEADER, ORIGINAL_ROUTING_KEY_HEADER,
    RETRY_COUNT_HEADER, RETRY_DELAY_HEADER,
};
use crate::resilience::backoff::backoff_for;
use crate::routing::{ExchangeKind, Router, RoutingError};

/// Longest `x-death-reason` kept, in characters.
pub const MAX_DEATH_REASON_LEN: usize = 1000;

const MAX_ATTEMPTS_REASON: &str = "Max retry attempts exceeded";

/// How a consumer failed to process a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Worth retrying (timeouts, unavailable dependencies).
    Transient,
    /// Will never succeed (malformed payload, rejected content).
    Permanent(String),
}

/// What to do with a failed delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Publish `message` to `exchange`, where it waits in `queue` for `delay`
    /// before [`Message::for_redelivery`] republishes it to `return_exchange`.
    Retry {
        exchange: String,
        queue: String,
        return_exchange: String,
        attempt: u32,
        delay: Duration,
        message: Message,
    },
    /// Publish `message` to the dead-letter `exchange`.
    DeadLetter { exchange: String, message: Message },
}

impl RetryDecision {
    pub fn exchange(&self) -> &str {
        match self {
            RetryDecision::Retry { exchange, .. } | RetryDecision::DeadLetter { exchange, .. } => {
                exchange
            }
        }
    }

    pub fn message(&self) -> &Message {
        match self {
            RetryDecision::Retry { message, .. } | RetryDecision::DeadLetter { message, .. } => {
                message
            }
        }
    }
}

/// Retry policy built from `[retry]` configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn retry_exchange(&self, source: &str) -> String {
        format!("{}{}", source, self.config.retry_suffix)
    }

    pub fn dead_letter_exchange(&self, source: &str) -> String {
        format!("{}{}", source, self.config.dead_letter_suffix)
    }

    /// Declare the retry and dead-letter exchanges that serve `source`.
    pub fn install(&self, router: &Router, source: &str) -> Result<(), RoutingError> {
        router.declare_exchange(&self.retry_exchange(source), ExchangeKind::Direct)?;
        router.declare_exchange(&self.dead_letter_exchange(source), ExchangeKind::Direct)?;
        Ok(())
    }

    /// Bind the holding queue a retry decision targets.
    ///
    /// Does nothing for dead-letter decisions; dead-letter queues come from the
    /// topology. Binding is idempotent.
    pub fn bind_holding_queue(
        &self,
        router: &Router,
        decision: &RetryDecision,
    ) -> Result<(), RoutingError> {
        if let RetryDecision::Retry { exchange, queue, .. } = decision {
            router.bind(exchange, queue, queue)?;
        }
        Ok(())
    }

    /// Decide what happens to a delivery from `source` that failed.
    pub fn plan(&self, source: &str, message: &Message, failure: FailureKind) -> RetryDecision {
        let retry_count = message.retry_count();

        let reason = match failure {
            FailureKind::Transient if retry_count < self.config.max_attempts => {
                let delay = backoff_for(&self.config, retry_count);
                let attempt = retry_count + 1;
                let queue = retry_queue_name(delay);
                let original_key = message.original_routing_key().to_string();
                let retried = Message {
                    routing_key: queue.clone(),
                    ..message.clone()
                }
                .with_header(RETRY_COUNT_HEADER, attempt)
                .with_header(ORIGINAL_ROUTING_KEY_HEADER, original_key)
                .with_header(RETRY_DELAY_HEADER, delay.as_millis() as u64);

                tracing::info!(
                    exchange = %source,
                    routing_key = %message.routing_key,
                    attempt,
                    max_attempts = self.config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling retry"
                );
                return RetryDecision::Retry {
                    exchange: self.retry_exchange(source),
                    queue,
                    return_exchange: source.to_string(),
                    attempt,
                    delay,
                    message: retried,
                };
            }
            FailureKind::Transient => MAX_ATTEMPTS_REASON.to_string(),
            FailureKind::Permanent(reason) => reason,
        };

        tracing::warn!(
            exchange = %source,
            routing_key = %message.routing_key,
            retry_count,
            reason = %reason,
            "Dead-lettering message"
        );
        RetryDecision::DeadLetter {
            exchange: self.dead_letter_exchange(source),
            message: dead_letter(message, &reason),
        }
    }
}

/// Name of the holding queue for a given retry delay.
pub fn retry_queue_name(delay: Duration) -> String {
    format!("retry_queue_{}s", delay.as_secs())
}

fn dead_letter(message: &Message, reason: &str) -> Message {
    let reason: String = reason.chars().take(MAX_DEATH_REASON_LEN).collect();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let original_key = message.original_routing_key().to_string();

    message
        .for_redelivery()
        .with_header(DEATH_REASON_HEADER, reason)
        .with_header(DEATH_TIMESTAMP_HEADER, now)
        .with_header(ORIGINAL_ROUTING_KEY_HEADER, original_key)
}
