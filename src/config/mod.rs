//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → ForwarderConfig (raw values, all defaulted)
//!     → validation.rs (range checks, silent substitution)
//!     → BackoffPolicy (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a tracker is built from it
//! - All fields have defaults to allow minimal configs
//! - Serde handles syntax; range problems are healed, never rejected

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BackoffConfig;
pub use schema::ForwarderConfig;
pub use schema::ObservabilityConfig;
pub use validation::{validate_backoff, SanitizedBackoff, ValidationWarning};
