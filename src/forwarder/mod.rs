//! Forwarding worker integration.
//!
//! # Data Flow
//! ```text
//! worker picks a payload for an endpoint
//!     → dispatch.rs asks the tracker whether the endpoint is blocked
//!     → blocked: skip, hand back the time until it opens
//!     → open: run the send
//!     → report failure or success back to the tracker
//! ```

pub mod dispatch;

pub use dispatch::{dispatch, DispatchError};
