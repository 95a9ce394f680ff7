//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Routing and config subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stderr)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (exchange, queue, pattern) on every event
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
