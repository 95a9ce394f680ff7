//! Configuration schema definitions.
//!
//! This module defines the topology file structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::ExchangeKind;

/// Root configuration: exchanges, bindings and ambient settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct TopologyConfig {
    /// Exchange declarations.
    pub exchanges: Vec<ExchangeConfig>,

    /// Queue bindings; each must reference a declared exchange.
    pub bindings: Vec<BindingConfig>,

    /// Retry and dead-letter settings.
    pub retry: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Exchange declaration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExchangeConfig {
    /// Exchange name.
    pub name: String,

    /// Dispatch mode (`direct`, `fanout` or `topic`).
    pub kind: ExchangeKind,
}

/// Queue binding.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BindingConfig {
    /// Exchange to bind on.
    pub exchange: String,

    /// Queue identifier.
    pub queue: String,

    /// Binding pattern; ignored by fanout exchanges.
    #[serde(default)]
    pub pattern: String,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of re-deliveries before dead-lettering (0 = never retry).
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Factor applied to the delay for every further attempt.
    pub multiplier: u32,

    /// Upper bound for a single delay in milliseconds.
    pub max_delay_ms: u64,

    /// Random extra delay as a fraction of the computed delay (0.0 - 1.0).
    pub jitter_ratio: f64,

    /// Appended to the source exchange name to form the retry exchange.
    pub retry_suffix: String,

    /// Appended to the source exchange name to form the dead-letter exchange.
    pub dead_letter_suffix: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            multiplier: 2,
            max_delay_ms: 60_000,
            jitter_ratio: 0.0,
            retry_suffix: "_retry".to_string(),
            dead_letter_suffix: "_dlq".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
