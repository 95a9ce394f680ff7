//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! serve:
//!     Load topology → Build router → Start watcher/metrics → Wait
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Notify subscribers → Stop watcher → Exit
//!
//! Signals (signals.rs):
//!     SIGINT (Ctrl+C) → Trigger graceful shutdown
//!
//! Reload (reload.rs):
//!     Validated topology from watcher → Router::apply_config
//! ```

pub mod reload;
pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
