//! Resource Implementations
//!
//! Implements the CRUD operations for each resource type. A handler decodes
//! its typed configuration once, calls the SDK, waits on the returned
//! request tracker, and re-reads the platform resource into state.

pub mod disk;
pub mod integration;
pub mod load_balancer;
pub mod network;
pub mod snapshot;

use async_trait::async_trait;

use crate::error::Result;
use crate::schema::ResourceSchema;
use crate::session::Session;
use crate::state::DynamicValue;

/// Trait for resource operations
#[async_trait]
pub trait ResourceHandler {
    /// Resource type name
    fn type_name() -> &'static str;

    /// Published attribute schema
    fn schema() -> ResourceSchema;

    /// Create a new resource
    async fn create(session: &Session, config: &DynamicValue) -> Result<DynamicValue>;

    /// Read an existing resource
    async fn read(session: &Session, state: &DynamicValue) -> Result<DynamicValue>;

    /// Update an existing resource
    async fn update(
        session: &Session,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue>;

    /// Delete a resource
    async fn delete(session: &Session, state: &DynamicValue) -> Result<()>;
}
