//! Data Source Implementations
//!
//! Read-only lookups resolving a platform resource by id or by exact name.
//! Name lookups go through the list endpoints with a `$filter` and must
//! match exactly one resource.

pub mod disk;
pub mod integration;
pub mod load_balancer;
pub mod network;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ProviderError, Result};
use crate::schema::ResourceSchema;
use crate::session::Session;
use crate::state::{decode_config, DynamicValue};

/// Trait for data-source reads
#[async_trait]
pub trait DataSourceHandler {
    /// Data source type name
    fn type_name() -> &'static str;

    /// Published attribute schema
    fn schema() -> ResourceSchema;

    /// Resolve the lookup and return the resource as state
    async fn read(session: &Session, config: &DynamicValue) -> Result<DynamicValue>;
}

#[derive(Debug, Deserialize)]
struct LookupConfig {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// How a data source addresses its resource: exactly one of `id` or `name`.
#[derive(Debug)]
pub(crate) enum Lookup {
    ById(String),
    ByName(String),
}

impl Lookup {
    pub(crate) fn decode(kind: &str, config: &DynamicValue) -> Result<Self> {
        let raw: LookupConfig = decode_config(config)?;
        match (raw.id, raw.name) {
            (Some(id), _) if !id.is_empty() => Ok(Lookup::ById(id)),
            (_, Some(name)) if !name.is_empty() => Ok(Lookup::ByName(name)),
            _ => Err(ProviderError::InvalidConfig(format!(
                "{kind} lookup needs either id or name"
            ))),
        }
    }
}

/// A name lookup is only usable when it matches a single resource.
pub(crate) fn single_match<T>(kind: &str, name: &str, mut content: Vec<T>) -> Result<T> {
    match content.len() {
        0 => Err(ProviderError::NotFound {
            kind: kind.to_string(),
            query: name.to_string(),
        }),
        1 => Ok(content.remove(0)),
        count => Err(ProviderError::AmbiguousMatch {
            kind: kind.to_string(),
            name: name.to_string(),
            count,
        }),
    }
}
