//! Configuration validation.
//!
//! # Responsibilities
//! - Range-check every backoff tunable
//! - Substitute the documented default for anything out of range
//! - Report each substitution so the caller can log it
//!
//! # Design Decisions
//! - Never fails: a malformed tuning knob must not stop the forwarder
//! - Pure function: `&BackoffConfig → SanitizedBackoff`
//! - Non-finite reals are out of range

use std::fmt;

use crate::config::schema::{
    BackoffConfig, DEFAULT_BACKOFF_BASE_SECS, DEFAULT_BACKOFF_FACTOR, DEFAULT_BACKOFF_MAX_SECS,
    DEFAULT_RECOVERY_INTERVAL,
};

/// A configuration value that was replaced by its default.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// Config key that was rejected.
    pub field: &'static str,
    /// The rejected value, rendered for logs.
    pub value: String,
    /// The substituted value, rendered for logs.
    pub default: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid backoff.{} = {}, using default {}",
            self.field, self.value, self.default
        )
    }
}

/// Backoff tunables with every value inside its valid range.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedBackoff {
    pub factor: f64,
    pub base_secs: f64,
    pub max_secs: f64,
    pub recovery_interval: u32,
    pub recovery_reset: bool,
    /// Substitutions made while sanitizing, in field order.
    pub warnings: Vec<ValidationWarning>,
}

/// Replace out-of-range tunables with their defaults.
pub fn validate_backoff(raw: &BackoffConfig) -> SanitizedBackoff {
    let mut warnings = Vec::new();

    let factor = real_or_default(
        "factor",
        raw.factor,
        raw.factor.is_finite() && raw.factor > 1.0,
        DEFAULT_BACKOFF_FACTOR,
        &mut warnings,
    );
    let base_secs = real_or_default(
        "base_secs",
        raw.base_secs,
        raw.base_secs.is_finite() && raw.base_secs > 0.0,
        DEFAULT_BACKOFF_BASE_SECS,
        &mut warnings,
    );
    let max_secs = real_or_default(
        "max_secs",
        raw.max_secs,
        raw.max_secs.is_finite() && raw.max_secs > 0.0,
        DEFAULT_BACKOFF_MAX_SECS,
        &mut warnings,
    );

    let recovery_interval = if raw.recovery_interval > 0 {
        u32::try_from(raw.recovery_interval).unwrap_or(u32::MAX)
    } else {
        warnings.push(ValidationWarning {
            field: "recovery_interval",
            value: raw.recovery_interval.to_string(),
            default: DEFAULT_RECOVERY_INTERVAL.to_string(),
        });
        DEFAULT_RECOVERY_INTERVAL
    };

    SanitizedBackoff {
        factor,
        base_secs,
        max_secs,
        recovery_interval,
        recovery_reset: raw.recovery_reset,
        warnings,
    }
}

fn real_or_default(
    field: &'static str,
    value: f64,
    valid: bool,
    default: f64,
    warnings: &mut Vec<ValidationWarning>,
) -> f64 {
    if valid {
        return value;
    }
    warnings.push(ValidationWarning {
        field,
        value: value.to_string(),
        default: default.to_string(),
    });
    default
}
