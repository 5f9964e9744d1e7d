//! Load-balancer data source

use super::{single_match, DataSourceHandler, Lookup};
use crate::error::Result;
use crate::resources::load_balancer::lb_to_state;
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use crate::session::Session;
use crate::state::DynamicValue;

pub struct LoadBalancerDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for LoadBalancerDataSource {
    fn type_name() -> &'static str {
        "altus_load_balancer"
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
            .attribute(Attribute::new("address", AttributeType::String).computed())
            .attribute(Attribute::new("created_at", AttributeType::String).computed())
    }

    async fn read(session: &Session, config: &DynamicValue) -> Result<DynamicValue> {
        let lb = match Lookup::decode("load balancer", config)? {
            Lookup::ById(id) => session.client().get_load_balancer(&id).await?,
            Lookup::ByName(name) => single_match(
                "load balancer",
                &name,
                session
                    .client()
                    .list_load_balancers(Some(&name))
                    .await?
                    .content,
            )?,
        };
        Ok(lb_to_state(&lb))
    }
}
