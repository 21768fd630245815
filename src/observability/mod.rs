//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Tracker transitions and config substitutions:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//! ```

pub mod logging;
pub mod metrics;
