//! Endpoint backoff and circuit breaking for a telemetry forwarder.

pub mod config;
pub mod forwarder;
pub mod observability;
pub mod resilience;

pub use config::ForwarderConfig;
pub use forwarder::{dispatch, DispatchError};
pub use resilience::{BackoffPolicy, EndpointTracker};
