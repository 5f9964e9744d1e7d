//! Block-device resource handler

use serde::Deserialize;
use tracing::debug;

use altus_sdk::models::{Disk, DiskSpec};

use super::ResourceHandler;
use crate::config::OperationTimeouts;
use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use crate::session::Session;
use crate::state::{
    bool_value, decode_config, get_int_attr, get_string_attr, int_value, make_state,
    opt_string_value, string_value, DynamicValue,
};
use crate::wait::wait_for_request;

pub struct DiskResource;

#[derive(Debug, Deserialize)]
struct DiskConfig {
    name: String,
    project_id: String,
    capacity_in_gb: i64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    persistent: Option<bool>,
    #[serde(default)]
    encrypted: Option<bool>,
    #[serde(default)]
    timeouts: Option<OperationTimeouts>,
}

impl DiskConfig {
    fn timeouts(&self) -> OperationTimeouts {
        self.timeouts.clone().unwrap_or_default()
    }

    fn spec(&self) -> DiskSpec {
        DiskSpec {
            name: self.name.clone(),
            project_id: self.project_id.clone(),
            capacity_in_gb: self.capacity_in_gb,
            description: self.description.clone(),
            persistent: self.persistent,
            encrypted: self.encrypted,
        }
    }
}

#[async_trait::async_trait]
impl ResourceHandler for DiskResource {
    fn type_name() -> &'static str {
        "altus_disk"
    }

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::type_name())
            .attribute(Attribute::new("id", AttributeType::String).computed())
            .attribute(Attribute::new("name", AttributeType::String).required())
            .attribute(Attribute::new("project_id", AttributeType::String).required())
            .attribute(
                Attribute::new("capacity_in_gb", AttributeType::Int)
                    .required()
                    .with_description("Disk capacity in gigabytes"),
            )
            .attribute(Attribute::new("description", AttributeType::String))
            .attribute(Attribute::new("persistent", AttributeType::Bool))
            .attribute(Attribute::new("encrypted", AttributeType::Bool))
            .attribute(Attribute::new("status", AttributeType::String).computed())
            .attribute(Attribute::new("created_at", AttributeType::String).computed())
            .attribute(
                Attribute::new("timeouts", AttributeType::Map(Box::new(AttributeType::Int)))
                    .with_description("Operation deadlines in minutes: create, delete"),
            )
    }

    async fn create(session: &Session, config: &DynamicValue) -> Result<DynamicValue> {
        let parsed: DiskConfig = decode_config(config)?;
        let timeouts = parsed.timeouts();

        let tracker = session.client().create_disk(&parsed.spec()).await?;
        let ids = wait_for_request(
            session.client(),
            &tracker.id,
            &session.wait_options(timeouts.create_timeout()),
        )
        .await?;
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MissingResourceLink {
                request_id: tracker.id.clone(),
            })?;

        let disk = session.client().get_disk(&id).await?;
        Ok(disk_to_state(&disk, config.get("timeouts")))
    }

    async fn read(session: &Session, state: &DynamicValue) -> Result<DynamicValue> {
        let id = get_string_attr(state, "id");
        let disk = session.client().get_disk(&id).await?;
        Ok(disk_to_state(&disk, state.get("timeouts")))
    }

    async fn update(
        session: &Session,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        let parsed: DiskConfig = decode_config(config)?;
        let id = get_string_attr(state, "id");

        let current = get_int_attr(state, "capacity_in_gb", 0);
        if parsed.capacity_in_gb != current {
            let tracker = session
                .client()
                .resize_disk(&id, parsed.capacity_in_gb)
                .await?;
            // Resize shares the create deadline; disks expose only create
            // and delete in their timeouts block.
            wait_for_request(
                session.client(),
                &tracker.id,
                &session.wait_options(parsed.timeouts().create_timeout()),
            )
            .await?;
        }

        let disk = session.client().get_disk(&id).await?;
        Ok(disk_to_state(&disk, config.get("timeouts")))
    }

    async fn delete(session: &Session, state: &DynamicValue) -> Result<()> {
        let id = get_string_attr(state, "id");
        let timeouts = OperationTimeouts::from_attr(state)?;

        let tracker = match session.client().delete_disk(&id).await {
            Err(altus_sdk::Error::NotFound { .. }) => {
                debug!("block device {} already gone", id);
                return Ok(());
            }
            other => other?,
        };
        wait_for_request(
            session.client(),
            &tracker.id,
            &session.wait_options(timeouts.delete_timeout()),
        )
        .await?;
        Ok(())
    }
}

pub(crate) fn disk_to_state(disk: &Disk, timeouts: Option<&DynamicValue>) -> DynamicValue {
    let mut attrs = vec![
        ("id", string_value(&disk.id)),
        ("name", string_value(&disk.name)),
        ("project_id", string_value(&disk.project_id)),
        ("capacity_in_gb", int_value(disk.capacity_in_gb)),
        ("description", opt_string_value(&disk.description)),
        ("persistent", bool_value(disk.persistent.unwrap_or(false))),
        ("encrypted", bool_value(disk.encrypted.unwrap_or(false))),
        ("status", opt_string_value(&disk.status)),
        ("created_at", opt_string_value(&disk.created_at)),
    ];
    if let Some(t) = timeouts {
        attrs.push(("timeouts", t.clone()));
    }
    make_state(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DynamicValue {
        make_state(vec![
            ("name", string_value("data")),
            ("project_id", string_value("proj-1")),
            ("capacity_in_gb", int_value(20)),
            ("timeouts", make_state(vec![("create", int_value(10))])),
        ])
    }

    #[test]
    fn config_decodes_with_timeouts() {
        let parsed: DiskConfig = decode_config(&config()).unwrap();
        assert_eq!(parsed.name, "data");
        assert_eq!(parsed.capacity_in_gb, 20);
        assert_eq!(
            parsed.timeouts().create_timeout(),
            std::time::Duration::from_secs(600)
        );
    }

    #[test]
    fn missing_capacity_is_an_invalid_config() {
        let state = make_state(vec![
            ("name", string_value("data")),
            ("project_id", string_value("proj-1")),
        ]);

        let err = decode_config::<DiskConfig>(&state).unwrap_err();
        assert!(err.to_string().contains("capacity_in_gb"));
    }

    #[test]
    fn schema_marks_platform_fields_computed() {
        let schema = DiskResource::schema();
        assert_eq!(schema.type_name, "altus_disk");
        assert!(schema.get("id").unwrap().computed);
        assert!(schema.get("name").unwrap().required);
        assert!(!schema.get("timeouts").unwrap().required);
    }

    #[test]
    fn state_carries_timeouts_through() {
        let disk = Disk {
            id: "bd-1".to_string(),
            name: "data".to_string(),
            project_id: "proj-1".to_string(),
            capacity_in_gb: 20,
            status: Some("OK".to_string()),
            ..Default::default()
        };

        let state = disk_to_state(&disk, config().get("timeouts"));
        assert_eq!(get_string_attr(&state, "id"), "bd-1");
        assert_eq!(get_int_attr(&state, "capacity_in_gb", 0), 20);
        assert_eq!(
            OperationTimeouts::from_attr(&state)
                .unwrap()
                .create_timeout(),
            std::time::Duration::from_secs(600)
        );
    }
}
