//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! topology file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TopologyConfig (validated, immutable)
//!     → Router::from_config builds the routing table
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Router::apply_config swaps the table atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All sections have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks
//! - A rejected reload keeps the current table

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::BindingConfig;
pub use schema::ExchangeConfig;
pub use schema::ObservabilityConfig;
pub use schema::RetryConfig;
pub use schema::TopologyConfig;
