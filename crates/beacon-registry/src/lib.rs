//! Beacon registry core
//!
//! In-memory service registry with liveness-based expiration:
//!
//! - **ServiceRegistry**: function name -> set of instances, safe for
//!   concurrent upserts, queries, and expiration sweeps without caller
//!   locking
//! - **ExpirationEngine**: periodic reconciliation against the cluster's
//!   live-pod inventory
//! - **PodLister**: the inventory collaborator, blocking by contract
//!
//! State is process-local and lost on restart by design; workers
//! re-announce themselves within one heartbeat interval.

#![deny(unsafe_code)]

pub mod error;
pub mod expire;
pub mod podlist;
pub mod store;

pub use error::{PodListError, RegistryError};
pub use expire::{ExpirationConfig, ExpirationEngine};
pub use podlist::{ClusterPodLister, PodLister};
pub use store::ServiceRegistry;
