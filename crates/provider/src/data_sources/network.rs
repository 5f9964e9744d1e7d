//! Network data source

use super::{single_match, DataSourceHandler, Lookup};
use crate::error::Result;
use crate::resources::network::network_to_state;
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use crate::session::Session;
use crate::state::DynamicValue;

pub struct NetworkDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for NetworkDataSource {
    fn type_name() -> &'static str {
        "altus_network"
    }

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::type_name())
            .attribute(
                Attribute::new("id", AttributeType::String)
                    .with_description("Lookup by platform id"),
            )
            .attribute(
                Attribute::new("name", AttributeType::String)
                    .with_description("Lookup by exact name"),
            )
            .attribute(Attribute::new("project_id", AttributeType::String).computed())
            .attribute(Attribute::new("cidr", AttributeType::String).computed())
            .attribute(Attribute::new("description", AttributeType::String).computed())
            .attribute(Attribute::new("created_at", AttributeType::String).computed())
    }

    async fn read(session: &Session, config: &DynamicValue) -> Result<DynamicValue> {
        let network = match Lookup::decode("network", config)? {
            Lookup::ById(id) => session.client().get_network(&id).await?,
            Lookup::ByName(name) => single_match(
                "network",
                &name,
                session.client().list_networks(Some(&name)).await?.content,
            )?,
        };
        Ok(network_to_state(&network, None))
    }
}
