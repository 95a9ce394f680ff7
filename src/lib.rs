//! In-process exchange router.
//!
//! Resolves which queues receive a published message, using the direct,
//! fanout and topic dispatch disciplines of AMQP-style brokers.

pub mod config;
pub mod lifecycle;
pub mod message;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::TopologyConfig;
pub use message::Message;
pub use routing::{ExchangeKind, Router, RoutingError};
