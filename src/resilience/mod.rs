//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Consumer reports failed delivery (transient / permanent):
//!     → retries.rs (retry budget left? permanent?)
//!     → backoff.rs (delay for this attempt)
//!     → RetryDecision::Retry  → <exchange>_retry, headers stamped
//!     → RetryDecision::DeadLetter → <exchange>_dlq, death headers stamped
//! ```
//!
//! # Design Decisions
//! - Retries never happen inside the router; the transport acts on the decision
//! - Exponential backoff, capped, optional jitter
//! - Permanent errors are never retried

pub mod backoff;
pub mod retries;

pub use retries::{FailureKind, RetryDecision, RetryPolicy};
