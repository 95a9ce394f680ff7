//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (bindings reference declared exchanges)
//! - Check patterns against each exchange's dispatch mode
//! - Validate retry value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TopologyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;

use thiserror::Error;

use crate::config::schema::TopologyConfig;
use crate::routing::exchange::{validate_pattern, ExchangeKind};
use crate::routing::RoutingError;

/// A single semantic problem in a topology file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("exchange #{index} has an empty name")]
    EmptyExchangeName { index: usize },

    #[error("exchange '{name}' declared as both {first} and {second}")]
    ConflictingExchange {
        name: String,
        first: ExchangeKind,
        second: ExchangeKind,
    },

    #[error("binding #{index} references undeclared exchange '{exchange}'")]
    UndeclaredExchange { index: usize, exchange: String },

    #[error("binding #{index} has an empty queue name")]
    EmptyQueueName { index: usize },

    #[error("binding #{index}: {source}")]
    Pattern { index: usize, source: RoutingError },

    #[error("retry.{field}: {reason}")]
    Retry { field: &'static str, reason: String },
}

/// Validate a topology, collecting every problem found.
pub fn validate_config(config: &TopologyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut kinds: HashMap<&str, ExchangeKind> = HashMap::new();

    for (index, exchange) in config.exchanges.iter().enumerate() {
        if exchange.name.is_empty() {
            errors.push(ValidationError::EmptyExchangeName { index });
            continue;
        }
        match kinds.get(exchange.name.as_str()) {
            Some(&first) if first != exchange.kind => {
                errors.push(ValidationError::ConflictingExchange {
                    name: exchange.name.clone(),
                    first,
                    second: exchange.kind,
                });
            }
            Some(_) => {}
            None => {
                kinds.insert(&exchange.name, exchange.kind);
            }
        }
    }

    for (index, binding) in config.bindings.iter().enumerate() {
        if binding.queue.is_empty() {
            errors.push(ValidationError::EmptyQueueName { index });
        }
        let Some(&kind) = kinds.get(binding.exchange.as_str()) else {
            errors.push(ValidationError::UndeclaredExchange {
                index,
                exchange: binding.exchange.clone(),
            });
            continue;
        };
        if let Err(source) = validate_pattern(&binding.exchange, kind, &binding.pattern) {
            errors.push(ValidationError::Pattern { index, source });
        }
    }

    let retry = &config.retry;
    if retry.multiplier == 0 {
        errors.push(ValidationError::Retry {
            field: "multiplier",
            reason: "must be at least 1".to_string(),
        });
    }
    if retry.max_delay_ms < retry.initial_delay_ms {
        errors.push(ValidationError::Retry {
            field: "max_delay_ms",
            reason: format!(
                "{} is below initial_delay_ms {}",
                retry.max_delay_ms, retry.initial_delay_ms
            ),
        });
    }
    if !(0.0..=1.0).contains(&retry.jitter_ratio) {
        errors.push(ValidationError::Retry {
            field: "jitter_ratio",
            reason: format!("{} is outside 0.0..=1.0", retry.jitter_ratio),
        });
    }
    if retry.retry_suffix.is_empty() || retry.dead_letter_suffix.is_empty() {
        errors.push(ValidationError::Retry {
            field: "retry_suffix",
            reason: "exchange suffixes must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BindingConfig, ExchangeConfig};

    fn exchange(name: &str, kind: ExchangeKind) -> ExchangeConfig {
        ExchangeConfig {
            name: name.into(),
            kind,
        }
    }

    fn binding(exchange: &str, queue: &str, pattern: &str) -> BindingConfig {
        BindingConfig {
            exchange: exchange.into(),
            queue: queue.into(),
            pattern: pattern.into(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = TopologyConfig {
            exchanges: vec![
                exchange("topic_logs", ExchangeKind::Topic),
                exchange("topic_logs", ExchangeKind::Topic),
            ],
            bindings: vec![binding("topic_logs", "errors", "*.error.*")],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let config = TopologyConfig {
            exchanges: vec![
                exchange("logs", ExchangeKind::Topic),
                exchange("logs", ExchangeKind::Direct),
                exchange("tasks", ExchangeKind::Direct),
            ],
            bindings: vec![
                binding("missing", "q", "a"),
                binding("logs", "q", "a*b"),
                binding("tasks", "q", "error.#"),
                binding("tasks", "", "error"),
            ],
            ..Default::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(matches!(errors[0], ValidationError::ConflictingExchange { .. }));
        assert!(matches!(errors[1], ValidationError::UndeclaredExchange { index: 0, .. }));
        assert!(matches!(
            errors[2],
            ValidationError::Pattern {
                index: 1,
                source: RoutingError::InvalidPattern { .. }
            }
        ));
        assert!(matches!(
            errors[3],
            ValidationError::Pattern {
                index: 2,
                source: RoutingError::ExchangeModeMismatch { .. }
            }
        ));
        assert!(matches!(errors[4], ValidationError::EmptyQueueName { index: 3 }));
    }

    #[test]
    fn test_retry_ranges() {
        let mut config = TopologyConfig::default();
        config.retry.multiplier = 0;
        config.retry.max_delay_ms = 10;
        config.retry.jitter_ratio = 1.5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
