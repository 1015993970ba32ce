//! Beacon shared types
//!
//! Wire and value types exchanged between the registry daemon, the
//! gateway, and worker-side heartbeat clients:
//!
//! - **Instance**: one running worker providing a function
//! - **Registration**: the `PUT /registrations` / `GET /registrations` envelope
//! - **ForwardRequest**: the gateway's inbound forwarding envelope
//!
//! All types are closed field sets with plain constructors. Unknown JSON
//! keys are ignored on deserialization.

#![deny(unsafe_code)]

pub mod instance;
pub mod registration;
pub mod request;

pub use instance::Instance;
pub use registration::Registration;
pub use request::{ForwardRequest, MessageRequest};
