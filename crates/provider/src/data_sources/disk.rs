//! Block-device data source

use super::{single_match, DataSourceHandler, Lookup};
use crate::error::Result;
use crate::resources::disk::disk_to_state;
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use crate::session::Session;
use crate::state::DynamicValue;

pub struct DiskDataSource;

#[async_trait::async_trait]
impl DataSourceHandler for DiskDataSource {
    fn type_name() -> &'static str {
        "altus_disk"
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
            .attribute(Attribute::new("capacity_in_gb", AttributeType::Int).computed())
            .attribute(Attribute::new("description", AttributeType::String).computed())
            .attribute(Attribute::new("status", AttributeType::String).computed())
            .attribute(Attribute::new("created_at", AttributeType::String).computed())
    }

    async fn read(session: &Session, config: &DynamicValue) -> Result<DynamicValue> {
        let disk = match Lookup::decode("block device", config)? {
            Lookup::ById(id) => session.client().get_disk(&id).await?,
            Lookup::ByName(name) => single_match(
                "block device",
                &name,
                session.client().list_disks(Some(&name)).await?.content,
            )?,
        };
        Ok(disk_to_state(&disk, None))
    }
}
