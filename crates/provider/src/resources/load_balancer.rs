//! Load-balancer resource handler
//!
//! Load-balancer requests always run under the fixed five-minute deadline;
//! the resource exposes no `timeouts` block.

use serde::Deserialize;
use tracing::debug;

use altus_sdk::models::{HealthCheck, LoadBalancer, LoadBalancerSpec, Route};

use super::ResourceHandler;
use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use crate::session::Session;
use crate::state::{
    decode_config, get_string_attr, int_value, list_value, make_state, null_value,
    opt_string_value, string_value, DynamicValue,
};
use crate::wait::{wait_for_request, LOAD_BALANCER_TIMEOUT};

pub struct LoadBalancerResource;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct HealthCheckConfig {
    protocol: String,
    #[serde(default)]
    port: Option<i64>,
    #[serde(default)]
    url_path: Option<String>,
    #[serde(default)]
    interval_seconds: Option<i64>,
    #[serde(default)]
    timeout_seconds: Option<i64>,
    #[serde(default)]
    unhealthy_threshold: Option<i64>,
    #[serde(default)]
    healthy_threshold: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct RouteConfig {
    protocol: String,
    port: i64,
    member_protocol: String,
    member_port: i64,
    #[serde(default)]
    health_check: Option<HealthCheckConfig>,
}

#[derive(Debug, Deserialize)]
struct LoadBalancerConfig {
    name: String,
    project_id: String,
    #[serde(default)]
    description: Option<String>,
    routes: Vec<RouteConfig>,
    #[serde(default)]
    target_links: Option<Vec<String>>,
}

impl LoadBalancerConfig {
    fn spec(&self) -> LoadBalancerSpec {
        LoadBalancerSpec {
            name: self.name.clone(),
            project_id: self.project_id.clone(),
            description: self.description.clone(),
            routes: expand_routes(&self.routes),
            target_links: self.target_links.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ResourceHandler for LoadBalancerResource {
    fn type_name() -> &'static str {
        "altus_load_balancer"
    }

    fn schema() -> ResourceSchema {
        let health_check = AttributeType::Object(vec![
            Attribute::new("protocol", AttributeType::String).required(),
            Attribute::new("port", AttributeType::Int),
            Attribute::new("url_path", AttributeType::String),
            Attribute::new("interval_seconds", AttributeType::Int),
            Attribute::new("timeout_seconds", AttributeType::Int),
            Attribute::new("unhealthy_threshold", AttributeType::Int),
            Attribute::new("healthy_threshold", AttributeType::Int),
        ]);
        let route = AttributeType::Object(vec![
            Attribute::new("protocol", AttributeType::String).required(),
            Attribute::new("port", AttributeType::Int).required(),
            Attribute::new("member_protocol", AttributeType::String).required(),
            Attribute::new("member_port", AttributeType::Int).required(),
            Attribute::new("health_check", health_check),
        ]);

        ResourceSchema::new(Self::type_name())
            .attribute(Attribute::new("id", AttributeType::String).computed())
            .attribute(Attribute::new("name", AttributeType::String).required())
            .attribute(Attribute::new("project_id", AttributeType::String).required())
            .attribute(Attribute::new("description", AttributeType::String))
            .attribute(
                Attribute::new("routes", AttributeType::List(Box::new(route)))
                    .required()
                    .with_description("Listener routes forwarded to member targets"),
            )
            .attribute(Attribute::new(
                "target_links",
                AttributeType::List(Box::new(AttributeType::String)),
            ))
            .attribute(Attribute::new("address", AttributeType::String).computed())
            .attribute(Attribute::new("created_at", AttributeType::String).computed())
    }

    async fn create(session: &Session, config: &DynamicValue) -> Result<DynamicValue> {
        let parsed: LoadBalancerConfig = decode_config(config)?;

        let tracker = session.client().create_load_balancer(&parsed.spec()).await?;
        let ids = wait_for_request(
            session.client(),
            &tracker.id,
            &session.wait_options(LOAD_BALANCER_TIMEOUT),
        )
        .await?;
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MissingResourceLink {
                request_id: tracker.id.clone(),
            })?;

        let lb = session.client().get_load_balancer(&id).await?;
        Ok(lb_to_state(&lb))
    }

    async fn read(session: &Session, state: &DynamicValue) -> Result<DynamicValue> {
        let id = get_string_attr(state, "id");
        let lb = session.client().get_load_balancer(&id).await?;
        Ok(lb_to_state(&lb))
    }

    async fn update(
        session: &Session,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        let parsed: LoadBalancerConfig = decode_config(config)?;
        let id = get_string_attr(state, "id");

        // Scale applies the full desired route set; the platform reconciles.
        let tracker = session
            .client()
            .scale_load_balancer(&id, &parsed.spec())
            .await?;
        wait_for_request(
            session.client(),
            &tracker.id,
            &session.wait_options(LOAD_BALANCER_TIMEOUT),
        )
        .await?;

        let lb = session.client().get_load_balancer(&id).await?;
        Ok(lb_to_state(&lb))
    }

    async fn delete(session: &Session, state: &DynamicValue) -> Result<()> {
        let id = get_string_attr(state, "id");

        let tracker = match session.client().delete_load_balancer(&id).await {
            Err(altus_sdk::Error::NotFound { .. }) => {
                debug!("load balancer {} already gone", id);
                return Ok(());
            }
            other => other?,
        };
        wait_for_request(
            session.client(),
            &tracker.id,
            &session.wait_options(LOAD_BALANCER_TIMEOUT),
        )
        .await?;
        Ok(())
    }
}

fn expand_health_check(config: &HealthCheckConfig) -> HealthCheck {
    HealthCheck {
        protocol: config.protocol.clone(),
        port: config.port,
        url_path: config.url_path.clone(),
        interval_seconds: config.interval_seconds,
        timeout_seconds: config.timeout_seconds,
        unhealthy_threshold: config.unhealthy_threshold,
        healthy_threshold: config.healthy_threshold,
    }
}

fn expand_routes(routes: &[RouteConfig]) -> Vec<Route> {
    routes
        .iter()
        .map(|r| Route {
            protocol: r.protocol.clone(),
            port: r.port,
            member_protocol: r.member_protocol.clone(),
            member_port: r.member_port,
            health_check: r.health_check.as_ref().map(expand_health_check),
        })
        .collect()
}

fn opt_int_value(value: Option<i64>) -> DynamicValue {
    value.map(int_value).unwrap_or_else(null_value)
}

fn flatten_health_check(health_check: &HealthCheck) -> DynamicValue {
    make_state(vec![
        ("protocol", string_value(&health_check.protocol)),
        ("port", opt_int_value(health_check.port)),
        ("url_path", opt_string_value(&health_check.url_path)),
        ("interval_seconds", opt_int_value(health_check.interval_seconds)),
        ("timeout_seconds", opt_int_value(health_check.timeout_seconds)),
        (
            "unhealthy_threshold",
            opt_int_value(health_check.unhealthy_threshold),
        ),
        (
            "healthy_threshold",
            opt_int_value(health_check.healthy_threshold),
        ),
    ])
}

fn flatten_routes(routes: &[Route]) -> DynamicValue {
    list_value(
        routes
            .iter()
            .map(|r| {
                make_state(vec![
                    ("protocol", string_value(&r.protocol)),
                    ("port", int_value(r.port)),
                    ("member_protocol", string_value(&r.member_protocol)),
                    ("member_port", int_value(r.member_port)),
                    (
                        "health_check",
                        r.health_check
                            .as_ref()
                            .map(flatten_health_check)
                            .unwrap_or_else(null_value),
                    ),
                ])
            })
            .collect(),
    )
}

pub(crate) fn lb_to_state(lb: &LoadBalancer) -> DynamicValue {
    make_state(vec![
        ("id", string_value(&lb.id)),
        ("name", string_value(&lb.name)),
        ("project_id", string_value(&lb.project_id)),
        ("description", opt_string_value(&lb.description)),
        ("routes", flatten_routes(&lb.routes)),
        (
            "target_links",
            lb.target_links
                .as_ref()
                .map(|links| list_value(links.iter().map(string_value).collect()))
                .unwrap_or_else(null_value),
        ),
        ("address", opt_string_value(&lb.address)),
        ("created_at", opt_string_value(&lb.created_at)),
    ])
}
