//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default so a minimal (or empty) file is valid.

use serde::{Deserialize, Serialize};

use crate::config::loader::ConfigError;

/// Default exponential growth base.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
/// Default first-tier backoff, in seconds.
pub const DEFAULT_BACKOFF_BASE_SECS: f64 = 2.0;
/// Default backoff ceiling, in seconds.
pub const DEFAULT_BACKOFF_MAX_SECS: f64 = 64.0;
/// Default number of error counts healed by one success.
pub const DEFAULT_RECOVERY_INTERVAL: u32 = 2;

/// Root configuration for the forwarder backoff core.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Endpoint backoff tunables.
    pub backoff: BackoffConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ForwarderConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Raw backoff tunables, as read from configuration.
///
/// Values are not trusted: out-of-range numbers are replaced with defaults by
/// [`validate_backoff`](crate::config::validation::validate_backoff) when a
/// policy is built.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackoffConfig {
    /// Exponential growth base. Must be greater than 1.
    pub factor: f64,

    /// First-tier backoff magnitude in seconds. Must be positive.
    pub base_secs: f64,

    /// Backoff ceiling in seconds. Must be positive.
    pub max_secs: f64,

    /// Error counts healed by a single success. Must be positive.
    pub recovery_interval: i64,

    /// Heal every error with a single success.
    pub recovery_reset: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            factor: DEFAULT_BACKOFF_FACTOR,
            base_secs: DEFAULT_BACKOFF_BASE_SECS,
            max_secs: DEFAULT_BACKOFF_MAX_SECS,
            recovery_interval: i64::from(DEFAULT_RECOVERY_INTERVAL),
            recovery_reset: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
