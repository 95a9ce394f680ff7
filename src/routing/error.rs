//! Routing error types.

use thiserror::Error;

use crate::routing::exchange::ExchangeKind;

/// Errors reported by the routing engine.
///
/// A route that matches no queue is not an error; it yields an empty set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The exchange was never declared.
    #[error("unknown exchange '{exchange}'")]
    UnknownExchange { exchange: String },

    /// The request needs a different dispatch mode than the exchange was declared with.
    #[error("exchange '{exchange}' is declared as {declared}, request requires {requested}")]
    ExchangeModeMismatch {
        exchange: String,
        declared: ExchangeKind,
        requested: ExchangeKind,
    },

    /// A topic pattern token mixes wildcard characters with other text.
    #[error("invalid pattern '{pattern}': token '{token}' must be a literal, '*' or '#'")]
    InvalidPattern { pattern: String, token: String },
}

impl RoutingError {
    pub(crate) fn unknown_exchange(exchange: &str) -> Self {
        RoutingError::UnknownExchange {
            exchange: exchange.to_string(),
        }
    }
}
