//! Network resource handler

use serde::Deserialize;
use tracing::debug;

use altus_sdk::models::{Network, NetworkSpec};

use super::ResourceHandler;
use crate::config::OperationTimeouts;
use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use crate::session::Session;
use crate::state::{
    decode_config, get_string_attr, make_state, opt_string_value, string_value, DynamicValue,
};
use crate::wait::wait_for_request;

pub struct NetworkResource;

#[derive(Debug, Deserialize)]
struct NetworkConfig {
    name: String,
    project_id: String,
    #[serde(default)]
    cidr: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    timeouts: Option<OperationTimeouts>,
}

#[async_trait::async_trait]
impl ResourceHandler for NetworkResource {
    fn type_name() -> &'static str {
        "altus_network"
    }

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::type_name())
            .attribute(Attribute::new("id", AttributeType::String).computed())
            .attribute(Attribute::new("name", AttributeType::String).required())
            .attribute(Attribute::new("project_id", AttributeType::String).required())
            .attribute(
                Attribute::new("cidr", AttributeType::String)
                    .with_description("CIDR block, e.g. 10.0.0.0/24"),
            )
            .attribute(Attribute::new("description", AttributeType::String))
            .attribute(Attribute::new("created_at", AttributeType::String).computed())
            .attribute(
                Attribute::new("timeouts", AttributeType::Map(Box::new(AttributeType::Int)))
                    .with_description("Operation deadlines in minutes: create, delete"),
            )
    }

    async fn create(session: &Session, config: &DynamicValue) -> Result<DynamicValue> {
        let parsed: NetworkConfig = decode_config(config)?;
        let timeouts = parsed.timeouts.clone().unwrap_or_default();

        let spec = NetworkSpec {
            name: parsed.name.clone(),
            project_id: parsed.project_id.clone(),
            cidr: parsed.cidr.clone(),
            description: parsed.description.clone(),
        };
        let tracker = session.client().create_network(&spec).await?;
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

        let network = session.client().get_network(&id).await?;
        Ok(network_to_state(&network, config.get("timeouts")))
    }

    async fn read(session: &Session, state: &DynamicValue) -> Result<DynamicValue> {
        let id = get_string_attr(state, "id");
        let network = session.client().get_network(&id).await?;
        Ok(network_to_state(&network, state.get("timeouts")))
    }

    async fn update(
        session: &Session,
        state: &DynamicValue,
        _config: &DynamicValue,
    ) -> Result<DynamicValue> {
        // Networks are immutable on the platform - just read the current state
        Self::read(session, state).await
    }

    async fn delete(session: &Session, state: &DynamicValue) -> Result<()> {
        let id = get_string_attr(state, "id");
        let timeouts = OperationTimeouts::from_attr(state)?;

        let tracker = match session.client().delete_network(&id).await {
            Err(altus_sdk::Error::NotFound { .. }) => {
                debug!("network {} already gone", id);
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

pub(crate) fn network_to_state(
    network: &Network,
    timeouts: Option<&DynamicValue>,
) -> DynamicValue {
    let mut attrs = vec![
        ("id", string_value(&network.id)),
        ("name", string_value(&network.name)),
        ("project_id", string_value(&network.project_id)),
        ("cidr", opt_string_value(&network.cidr)),
        ("description", opt_string_value(&network.description)),
        ("created_at", opt_string_value(&network.created_at)),
    ];
    if let Some(t) = timeouts {
        attrs.push(("timeouts", t.clone()));
    }
    make_state(attrs)
}
