//! Integration resource handler

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use altus_sdk::models::{Integration, IntegrationSpec};

use super::ResourceHandler;
use crate::config::OperationTimeouts;
use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use crate::session::Session;
use crate::state::{
    decode_config, get_string_attr, make_state, opt_string_value, string_value, DynamicValue,
};
use crate::wait::wait_for_request;

pub struct IntegrationResource;

#[derive(Debug, Deserialize)]
struct IntegrationConfig {
    name: String,
    integration_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    integration_properties: HashMap<String, String>,
    #[serde(default)]
    timeouts: Option<OperationTimeouts>,
}

impl IntegrationConfig {
    fn timeouts(&self) -> OperationTimeouts {
        self.timeouts.clone().unwrap_or_default()
    }

    fn spec(&self) -> IntegrationSpec {
        IntegrationSpec {
            name: self.name.clone(),
            integration_type: self.integration_type.clone(),
            description: self.description.clone(),
            integration_properties: self.integration_properties.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ResourceHandler for IntegrationResource {
    fn type_name() -> &'static str {
        "altus_integration"
    }

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::type_name())
            .attribute(Attribute::new("id", AttributeType::String).computed())
            .attribute(Attribute::new("name", AttributeType::String).required())
            .attribute(
                Attribute::new("integration_type", AttributeType::String)
                    .required()
                    .with_description("Kind of external system, e.g. github or ansible"),
            )
            .attribute(Attribute::new("description", AttributeType::String))
            .attribute(
                Attribute::new(
                    "integration_properties",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .with_description("Endpoint properties such as url or privateKey"),
            )
            .attribute(Attribute::new("status", AttributeType::String).computed())
            .attribute(Attribute::new("created_at", AttributeType::String).computed())
            .attribute(
                Attribute::new("timeouts", AttributeType::Map(Box::new(AttributeType::Int)))
                    .with_description("Operation deadlines in minutes: create, update"),
            )
    }

    async fn create(session: &Session, config: &DynamicValue) -> Result<DynamicValue> {
        let parsed: IntegrationConfig = decode_config(config)?;
        let timeouts = parsed.timeouts();

        let tracker = session.client().create_integration(&parsed.spec()).await?;
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

        let integration = session.client().get_integration(&id).await?;
        Ok(integration_to_state(&integration, config.get("timeouts")))
    }

    async fn read(session: &Session, state: &DynamicValue) -> Result<DynamicValue> {
        let id = get_string_attr(state, "id");
        let integration = session.client().get_integration(&id).await?;
        Ok(integration_to_state(&integration, state.get("timeouts")))
    }

    async fn update(
        session: &Session,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        let parsed: IntegrationConfig = decode_config(config)?;
        let id = get_string_attr(state, "id");

        let tracker = session
            .client()
            .update_integration(&id, &parsed.spec())
            .await?;
        wait_for_request(
            session.client(),
            &tracker.id,
            &session.wait_options(parsed.timeouts().update_timeout()),
        )
        .await?;

        let integration = session.client().get_integration(&id).await?;
        Ok(integration_to_state(&integration, config.get("timeouts")))
    }

    async fn delete(session: &Session, state: &DynamicValue) -> Result<()> {
        let id = get_string_attr(state, "id");
        // Deletes share the update deadline; only create and update are
        // separately configurable for integrations.
        let timeouts = OperationTimeouts::from_attr(state)?;

        let tracker = match session.client().delete_integration(&id).await {
            Err(altus_sdk::Error::NotFound { .. }) => {
                debug!("integration {} already gone", id);
                return Ok(());
            }
            other => other?,
        };
        wait_for_request(
            session.client(),
            &tracker.id,
            &session.wait_options(timeouts.update_timeout()),
        )
        .await?;
        Ok(())
    }
}

fn properties_value(properties: &HashMap<String, String>) -> DynamicValue {
    DynamicValue::Map(
        properties
            .iter()
            .map(|(k, v)| (k.clone(), DynamicValue::String(v.clone())))
            .collect(),
    )
}

pub(crate) fn integration_to_state(
    integration: &Integration,
    timeouts: Option<&DynamicValue>,
) -> DynamicValue {
    let mut attrs = vec![
        ("id", string_value(&integration.id)),
        ("name", string_value(&integration.name)),
        (
            "integration_type",
            string_value(&integration.integration_type),
        ),
        ("description", opt_string_value(&integration.description)),
        (
            "integration_properties",
            properties_value(&integration.integration_properties),
        ),
        ("status", opt_string_value(&integration.status)),
        ("created_at", opt_string_value(&integration.created_at)),
    ];
    if let Some(t) = timeouts {
        attrs.push(("timeouts", t.clone()));
    }
    make_state(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_decode_from_nested_map() {
        let config: DynamicValue = serde_json::from_value(serde_json::json!({
            "name": "gh",
            "integration_type": "github",
            "integration_properties": { "url": "https://api.github.com" }
        }))
        .unwrap();

        let parsed: IntegrationConfig = decode_config(&config).unwrap();
        assert_eq!(
            parsed.integration_properties.get("url").map(String::as_str),
            Some("https://api.github.com")
        );
    }

    #[test]
    fn properties_round_trip_through_state() {
        let mut properties = HashMap::new();
        properties.insert("url".to_string(), "https://api.github.com".to_string());
        let integration = Integration {
            id: "int-1".to_string(),
            name: "gh".to_string(),
            integration_type: "github".to_string(),
            integration_properties: properties,
            ..Default::default()
        };

        let state = integration_to_state(&integration, None);
        assert_eq!(
            state
                .get("integration_properties")
                .and_then(|p| p.get("url"))
                .and_then(|v| v.as_string()),
            Some("https://api.github.com")
        );
    }

    #[test]
    fn integration_type_is_required() {
        let state = make_state(vec![("name", string_value("gh"))]);

        let err = decode_config::<IntegrationConfig>(&state).unwrap_err();
        assert!(err.to_string().contains("integration_type"));
    }
}
