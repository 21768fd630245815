//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ForwarderConfig;

/// Error type for configuration loading.
///
/// Only unreadable or malformed files are errors. Values outside their valid
/// range are substituted when the backoff policy is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ForwarderConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = ForwarderConfig::from_toml_str(&content)?;

    tracing::debug!(path = %path.display(), "Configuration file parsed");
    Ok(config)
}
