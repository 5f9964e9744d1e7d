//! Integration data source

use super::{single_match, DataSourceHandler, Lookup};
use crate::error::Result;
use crate::resources::integration::integration_to_state;
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use crate::session::Session;
use crate::state::DynamicValue;

pub struct IntegrationDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for IntegrationDataSource {
    fn type_name() -> &'static str {
        "altus_integration"
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
            .attribute(Attribute::new("integration_type", AttributeType::String).computed())
            .attribute(Attribute::new("status", AttributeType::String).computed())
            .attribute(Attribute::new("created_at", AttributeType::String).computed())
    }

    async fn read(session: &Session, config: &DynamicValue) -> Result<DynamicValue> {
        let integration = match Lookup::decode("integration", config)? {
            Lookup::ById(id) => session.client().get_integration(&id).await?,
            Lookup::ByName(name) => single_match(
                "integration",
                &name,
                session
                    .client()
                    .list_integrations(Some(&name))
                    .await?
                    .content,
            )?,
        };
        Ok(integration_to_state(&integration, None))
    }
}
