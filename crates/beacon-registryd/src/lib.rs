//! Beacon registry daemon library
//!
//! The binary in `main.rs` is a thin CLI over these modules; they are
//! exported so other components can embed or integration-test the
//! registry endpoint against the real router.

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod server;
