//! Shared helpers for integration tests.

use forwarder_backoff::config::BackoffConfig;
use forwarder_backoff::{BackoffPolicy, EndpointTracker};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Tracker over the default policy with reproducible jitter.
pub fn seeded_tracker(seed: u64) -> EndpointTracker {
    EndpointTracker::with_rng(BackoffPolicy::default(), StdRng::seed_from_u64(seed))
}

/// Tracker built from raw (possibly invalid) tunables.
#[allow(dead_code)]
pub fn tracker_from(config: BackoffConfig) -> EndpointTracker {
    EndpointTracker::with_rng(BackoffPolicy::from_config(&config), StdRng::seed_from_u64(10))
}
