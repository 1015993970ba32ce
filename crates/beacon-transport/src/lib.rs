//! Beacon graceful transport
//!
//! HTTP listener wrapper shared by every Beacon daemon. Each accepted
//! connection is tracked in a shared set whose size is published through a
//! watch channel on every add and remove, so shutdown can observe "now
//! empty" without polling. Shutdown drains tracked connections with a
//! per-connection budget, force-closing on budget expiry, and connections
//! arriving after termination begins are drained immediately instead of
//! being tracked.
//!
//! Server states: Accepting -> Terminating -> Stopped. Connection states:
//! Open -> Draining -> Closed.

#![deny(unsafe_code)]

mod error;
mod server;
mod tracker;

pub use error::TransportError;
pub use server::{GracefulServer, ServerHandle, DEFAULT_DRAIN_BUDGET};
pub use tracker::ConnectionTracker;
