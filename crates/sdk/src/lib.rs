//! Altus Platform SDK
//!
//! REST client and shared wire types for the Altus cloud-automation
//! platform's infrastructure-as-a-service API under `/iaas/api`.

pub mod client;
pub mod error;
pub mod models;
pub mod tracker;

// Re-export commonly used types
pub use client::ApiClient;
pub use error::{Error, Result};
pub use tracker::{RequestStatus, RequestTracker, TrackRequests};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
