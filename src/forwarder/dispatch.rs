//! Gate a single send attempt on endpoint health.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::observability::metrics;
use crate::resilience::EndpointTracker;

/// Why a dispatch did not deliver.
#[derive(Debug, Error)]
pub enum DispatchError<E> {
    /// The endpoint is backing off; the send was not attempted.
    #[error("endpoint {endpoint} is blocked for another {retry_in:?}")]
    Blocked { endpoint: String, retry_in: Duration },

    /// The send ran and failed. The failure has been recorded.
    #[error("send failed: {0}")]
    Send(#[source] E),
}

impl<E> DispatchError<E> {
    pub fn is_blocked(&self) -> bool {
        matches!(self, DispatchError::Blocked { .. })
    }
}

/// Run `send` against `endpoint` unless it is blocked, and record the outcome.
pub async fn dispatch<R, F, Fut, T, E>(
    tracker: &EndpointTracker<R>,
    endpoint: &str,
    send: F,
) -> Result<T, DispatchError<E>>
where
    R: Rng,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(retry_in) = tracker.retry_in(endpoint) {
        metrics::record_dispatch_skipped(endpoint);
        tracing::trace!(endpoint, retry_in_secs = retry_in.as_secs_f64(), "Skipping blocked endpoint");
        return Err(DispatchError::Blocked {
            endpoint: endpoint.to_string(),
            retry_in,
        });
    }

    match send().await {
        Ok(value) => {
            tracker.record_success(endpoint);
            Ok(value)
        }
        Err(e) => {
            tracker.record_failure(endpoint);
            Err(DispatchError::Send(e))
        }
    }
}
