//! Block-device snapshot resource handler

use serde::Deserialize;
use tracing::debug;

use altus_sdk::models::{Snapshot, SnapshotSpec};

use super::ResourceHandler;
use crate::config::OperationTimeouts;
use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use crate::session::Session;
use crate::state::{
    decode_config, get_string_attr, make_state, opt_string_value, string_value, DynamicValue,
};
use crate::wait::wait_for_request;

pub struct SnapshotResource;

#[derive(Debug, Deserialize)]
struct SnapshotConfig {
    disk_id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    timeouts: Option<OperationTimeouts>,
}

#[async_trait::async_trait]
impl ResourceHandler for SnapshotResource {
    fn type_name() -> &'static str {
        "altus_disk_snapshot"
    }

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::type_name())
            .attribute(Attribute::new("id", AttributeType::String).computed())
            .attribute(
                Attribute::new("disk_id", AttributeType::String)
                    .required()
                    .with_description("Block device to snapshot"),
            )
            .attribute(Attribute::new("name", AttributeType::String).required())
            .attribute(Attribute::new("description", AttributeType::String))
            .attribute(Attribute::new("created_at", AttributeType::String).computed())
            .attribute(
                Attribute::new("timeouts", AttributeType::Map(Box::new(AttributeType::Int)))
                    .with_description("Operation deadlines in minutes: create, delete"),
            )
    }

    async fn create(session: &Session, config: &DynamicValue) -> Result<DynamicValue> {
        let parsed: SnapshotConfig = decode_config(config)?;
        let timeouts = parsed.timeouts.clone().unwrap_or_default();

        let spec = SnapshotSpec {
            name: parsed.name.clone(),
            description: parsed.description.clone(),
        };
        let tracker = session
            .client()
            .create_snapshot(&parsed.disk_id, &spec)
            .await?;
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

        let snapshot = session.client().get_snapshot(&parsed.disk_id, &id).await?;
        Ok(snapshot_to_state(
            &snapshot,
            &parsed.disk_id,
            config.get("timeouts"),
        ))
    }

    async fn read(session: &Session, state: &DynamicValue) -> Result<DynamicValue> {
        let disk_id = get_string_attr(state, "disk_id");
        let id = get_string_attr(state, "id");
        let snapshot = session.client().get_snapshot(&disk_id, &id).await?;
        Ok(snapshot_to_state(&snapshot, &disk_id, state.get("timeouts")))
    }

    async fn update(
        session: &Session,
        state: &DynamicValue,
        _config: &DynamicValue,
    ) -> Result<DynamicValue> {
        // Snapshots are immutable once taken - just read the current state
        Self::read(session, state).await
    }

    async fn delete(session: &Session, state: &DynamicValue) -> Result<()> {
        let disk_id = get_string_attr(state, "disk_id");
        let id = get_string_attr(state, "id");
        let timeouts = OperationTimeouts::from_attr(state)?;

        let tracker = match session.client().delete_snapshot(&disk_id, &id).await {
            Err(altus_sdk::Error::NotFound { .. }) => {
                debug!("snapshot {} already gone", id);
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

fn snapshot_to_state(
    snapshot: &Snapshot,
    disk_id: &str,
    timeouts: Option<&DynamicValue>,
) -> DynamicValue {
    let mut attrs = vec![
        ("id", string_value(&snapshot.id)),
        ("disk_id", string_value(disk_id)),
        ("name", string_value(&snapshot.name)),
        ("description", opt_string_value(&snapshot.description)),
        ("created_at", opt_string_value(&snapshot.created_at)),
    ];
    if let Some(t) = timeouts {
        attrs.push(("timeouts", t.clone()));
    }
    make_state(attrs)
}
