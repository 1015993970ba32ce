//! Registry error types

use thiserror::Error;

/// Errors from registry mutations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid instance for function {function}: {reason}")]
    Validation { function: String, reason: String },

    #[error("Registry inconsistent after upsert of {name} into {function}")]
    Inconsistent { function: String, name: String },
}

/// Errors from the cluster pod inventory.
#[derive(Debug, Error)]
pub enum PodListError {
    #[error("Pod inventory credentials unavailable: {0}")]
    Credentials(String),

    #[error("Pod inventory request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Pod inventory returned status {0}")]
    Status(u16),

    #[error("Pod inventory response malformed: {0}")]
    Malformed(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
