//! Per-endpoint circuit breaker.
//!
//! # States
//! - Open: `now >= blocked_until`, sends go through
//! - Blocked: `now < blocked_until`, sends are deferred
//!
//! # State Transitions
//! ```text
//! Open → Blocked: record_failure
//! Blocked → Blocked: record_failure (longer window) / record_success (shorter window)
//! Blocked → Open: record_success healing the error count to zero
//! ```
//!
//! Both states carry the consecutive error count that sizes the next window.
//! Entries are created on first report and kept for the tracker's lifetime.
//! A window too long to represent as an `Instant` is cut to 100 years.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::backoff::BackoffPolicy;

/// Longest block window handed out, for ceilings past what `Instant` holds.
const MAX_BLOCK: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn block_deadline(now: Instant, backoff: Duration) -> Instant {
    now.checked_add(backoff)
        .or_else(|| now.checked_add(MAX_BLOCK))
        .unwrap_or(now)
}

#[derive(Debug, Clone, Copy)]
struct EndpointState {
    error_count: u32,
    blocked_until: Instant,
}

impl EndpointState {
    fn new(now: Instant) -> Self {
        Self {
            error_count: 0,
            blocked_until: now,
        }
    }
}

/// Point-in-time view of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointStatus {
    /// Consecutive error count, at most `max_errors`.
    pub error_count: u32,
    #[serde(skip)]
    pub blocked_until: Instant,
    /// Time left blocked; zero when open.
    #[serde(serialize_with = "serialize_secs")]
    pub remaining: Duration,
}

impl EndpointStatus {
    pub fn is_blocked(&self) -> bool {
        !self.remaining.is_zero()
    }
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

/// Concurrent registry of endpoint failure state.
///
/// Shared by every forwarding worker, usually behind an `Arc`. Each operation
/// holds the endpoint's map shard for the whole lookup-create-mutate sequence,
/// and the jitter source sits behind its own lock taken only inside it.
#[derive(Debug)]
pub struct EndpointTracker<R = StdRng> {
    policy: BackoffPolicy,
    endpoints: DashMap<String, EndpointState>,
    rng: Mutex<R>,
}

impl EndpointTracker<StdRng> {
    /// Create a tracker with an entropy-seeded jitter source.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }
}

impl<R: Rng> EndpointTracker<R> {
    /// Create a tracker with an explicit jitter source.
    pub fn with_rng(policy: BackoffPolicy, rng: R) -> Self {
        tracing::debug!(
            max_errors = policy.max_errors(),
            recovery_interval = policy.recovery_interval(),
            max_backoff_secs = policy.max_backoff_secs(),
            "Endpoint tracker created"
        );
        Self {
            policy,
            endpoints: DashMap::new(),
            rng: Mutex::new(rng),
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Return true if the endpoint is blocked right now.
    ///
    /// Unknown endpoints are never blocked.
    pub fn is_blocked(&self, endpoint: &str) -> bool {
        self.endpoints
            .get(endpoint)
            .is_some_and(|state| Instant::now() < state.blocked_until)
    }

    /// Report a failed send to `endpoint`.
    pub fn record_failure(&self, endpoint: &str) {
        let mut state = self
            .endpoints
            .entry(endpoint.to_string())
            .or_insert_with(|| EndpointState::new(Instant::now()));

        let max_errors = self.policy.max_errors();
        state.error_count = state.error_count.saturating_add(1).min(max_errors);

        let backoff = self.backoff_duration(state.error_count);
        state.blocked_until = block_deadline(Instant::now(), backoff);

        let error_count = state.error_count;
        drop(state);

        metrics::record_endpoint_failure(endpoint, error_count, backoff);
        if error_count == max_errors {
            tracing::warn!(
                endpoint,
                error_count,
                backoff_secs = backoff.as_secs_f64(),
                "Endpoint backoff at maximum"
            );
        } else {
            tracing::debug!(
                endpoint,
                error_count,
                backoff_secs = backoff.as_secs_f64(),
                "Endpoint blocked"
            );
        }
    }

    /// Report a successful send to `endpoint`.
    ///
    /// Heals `recovery_interval` errors. Once the count reaches zero the
    /// endpoint is open immediately; otherwise the block window shrinks to the
    /// one for the reduced count.
    pub fn record_success(&self, endpoint: &str) {
        let now = Instant::now();
        let mut state = self
            .endpoints
            .entry(endpoint.to_string())
            .or_insert_with(|| EndpointState::new(now));

        let previous = state.error_count;
        state.error_count = previous.saturating_sub(self.policy.recovery_interval());
        state.blocked_until = if state.error_count == 0 {
            now
        } else {
            block_deadline(now, self.backoff_duration(state.error_count))
        };

        let error_count = state.error_count;
        drop(state);

        if previous == 0 {
            return;
        }
        metrics::record_endpoint_recovery(endpoint, error_count);
        if error_count == 0 {
            tracing::info!(endpoint, previous_errors = previous, "Endpoint unblocked");
        } else {
            tracing::debug!(endpoint, error_count, "Endpoint partially recovered");
        }
    }

    /// Snapshot of one endpoint, if it has ever been reported.
    pub fn status(&self, endpoint: &str) -> Option<EndpointStatus> {
        let state = *self.endpoints.get(endpoint)?;
        Some(EndpointStatus {
            error_count: state.error_count,
            blocked_until: state.blocked_until,
            remaining: state.blocked_until.saturating_duration_since(Instant::now()),
        })
    }

    /// Time until `endpoint` opens, or `None` if it is open.
    pub fn retry_in(&self, endpoint: &str) -> Option<Duration> {
        self.status(endpoint)
            .map(|status| status.remaining)
            .filter(|remaining| !remaining.is_zero())
    }

    /// Identifiers of every tracked endpoint, sorted.
    pub fn endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self.endpoints.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    fn backoff_duration(&self, attempt: u32) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.policy.backoff_duration(attempt, &mut *rng)
    }
}
