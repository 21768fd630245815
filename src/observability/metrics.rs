//! Metrics for endpoint backoff.
//!
//! # Metrics
//! - `forwarder_endpoint_failures_total` (counter): failures reported per endpoint
//! - `forwarder_endpoint_recoveries_total` (counter): successes reported per endpoint
//! - `forwarder_endpoint_error_count` (gauge): current consecutive error count
//! - `forwarder_endpoint_backoff_seconds` (histogram): block windows handed out
//! - `forwarder_dispatch_skipped_total` (counter): sends skipped while blocked
//!
//! Recorded through the `metrics` facade; without an installed recorder every
//! call is a no-op.

use std::time::Duration;

pub fn record_endpoint_failure(endpoint: &str, error_count: u32, backoff: Duration) {
    let labels = [("endpoint", endpoint.to_string())];
    metrics::counter!("forwarder_endpoint_failures_total", &labels).increment(1);
    metrics::gauge!("forwarder_endpoint_error_count", &labels).set(f64::from(error_count));
    metrics::histogram!("forwarder_endpoint_backoff_seconds", &labels)
        .record(backoff.as_secs_f64());
}

pub fn record_endpoint_recovery(endpoint: &str, error_count: u32) {
    let labels = [("endpoint", endpoint.to_string())];
    metrics::counter!("forwarder_endpoint_recoveries_total", &labels).increment(1);
    metrics::gauge!("forwarder_endpoint_error_count", &labels).set(f64::from(error_count));
}

pub fn record_dispatch_skipped(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    metrics::counter!("forwarder_dispatch_skipped_total", &labels).increment(1);
}
