//! Transport error types

use std::net::SocketAddr;
use thiserror::Error;

/// Errors from the graceful transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}
