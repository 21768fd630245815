//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Send attempt to an endpoint:
//!     → circuit_breaker.rs (is the endpoint blocked?)
//!     → On failure: circuit_breaker.rs bumps the error count,
//!       backoff.rs sizes the new block window
//!     → On success: circuit_breaker.rs heals the error count,
//!       shrinking or clearing the window
//! ```
//!
//! # Design Decisions
//! - Per-endpoint state, one policy per tracker
//! - Jittered backoff prevents synchronized retry storms
//! - Recovery is gradual unless configured to reset
//! - Nothing here fails or waits; callers decide what to do with a block

pub mod backoff;
pub mod circuit_breaker;

pub use backoff::{BackoffPolicy, BackoffWindow};
pub use circuit_breaker::{EndpointStatus, EndpointTracker};
