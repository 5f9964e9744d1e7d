//! Altus Terraform Provider
//!
//! This crate implements the resource and data-source layer of a Terraform
//! provider for the Altus cloud-automation platform. Provisioning calls are
//! asynchronous on the platform side, so every mutating operation submits a
//! request and then tracks it to completion through [`wait`].

pub mod config;
pub mod data_sources;
pub mod error;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod session;
pub mod state;
pub mod wait;

pub use config::{OperationTimeouts, ProviderConfig};
pub use error::{ProviderError, Result};
pub use provider::AltusProvider;
pub use session::Session;
pub use state::DynamicValue;
pub use wait::{PollOutcome, WaitError, WaitOptions};
