//! Error types for the Altus provider

use thiserror::Error;

use crate::wait::WaitError;

/// Result type alias using the provider error
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors surfaced by resource and data-source handlers
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("unknown data source type: {0}")]
    UnknownDataSourceType(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no {kind} matches {query:?}")]
    NotFound { kind: String, query: String },

    #[error("{count} {kind}s match name {name:?}")]
    AmbiguousMatch {
        kind: String,
        name: String,
        count: usize,
    },

    #[error("request {request_id} finished without a resource link")]
    MissingResourceLink { request_id: String },

    #[error(transparent)]
    Sdk(#[from] altus_sdk::Error),

    #[error(transparent)]
    Wait(#[from] WaitError),
}
