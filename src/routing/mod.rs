//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Published message (exchange, routing key)
//!     → router.rs (load current table snapshot)
//!     → exchange.rs (dispatch by mode: direct / fanout / topic)
//!     → matcher.rs (topic pattern evaluation)
//!     → Return: set of queue ids (possibly empty) or UnknownExchange
//!
//! Topology changes:
//!     declare / bind / unbind / apply_config
//!     → clone table, mutate, validate
//!     → atomic swap of Arc<RoutingTable>
//! ```
//!
//! # Design Decisions
//! - Dispatch mode is a closed enum chosen at declaration time
//! - Readers never lock; writers are serialized
//! - Deterministic: result is a set, independent of bind order
//! - Zero matches is a normal outcome, an undeclared exchange is not

pub mod error;
pub mod exchange;
pub mod matcher;
pub mod router;

pub use error::RoutingError;
pub use exchange::{Binding, Exchange, ExchangeKind};
pub use matcher::TopicPattern;
pub use router::{ExchangeSummary, Router, RoutingTable};
