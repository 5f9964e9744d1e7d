//! Provider facade.
//!
//! Owns the authenticated session and dispatches resource and data-source
//! operations by type name. A plugin-protocol server would sit directly on
//! top of this surface; everything below it stays protocol-agnostic.

use tracing::{debug, info};

use altus_sdk::ApiClient;

use crate::config::ProviderConfig;
use crate::data_sources::disk::DiskDataSource;
use crate::data_sources::integration::IntegrationDataSource;
use crate::data_sources::load_balancer::LoadBalancerDataSource;
use crate::data_sources::network::NetworkDataSource;
use crate::data_sources::DataSourceHandler;
use crate::error::{ProviderError, Result};
use crate::resources::disk::DiskResource;
use crate::resources::integration::IntegrationResource;
use crate::resources::load_balancer::LoadBalancerResource;
use crate::resources::network::NetworkResource;
use crate::resources::snapshot::SnapshotResource;
use crate::resources::ResourceHandler;
use crate::schema::ResourceSchema;
use crate::session::Session;
use crate::state::{make_state, string_value, DynamicValue};

/// Altus Terraform provider.
#[derive(Debug)]
pub struct AltusProvider {
    session: Session,
}

impl AltusProvider {
    /// Validate the configuration, log in, and build a ready provider.
    pub async fn configure(config: ProviderConfig) -> Result<Self> {
        config.validate()?;

        info!("configuring provider against {}", config.url);
        let client = ApiClient::connect(&config.url, &config.refresh_token).await?;

        Ok(Self {
            session: Session::new(client, config.poll_interval()),
        })
    }

    /// Schemas for every resource type this provider serves.
    pub fn resource_schemas() -> Vec<ResourceSchema> {
        vec![
            DiskResource::schema(),
            SnapshotResource::schema(),
            NetworkResource::schema(),
            LoadBalancerResource::schema(),
            IntegrationResource::schema(),
        ]
    }

    /// Schemas for every data source this provider serves.
    pub fn data_source_schemas() -> Vec<ResourceSchema> {
        vec![
            DiskDataSource::schema(),
            NetworkDataSource::schema(),
            LoadBalancerDataSource::schema(),
            IntegrationDataSource::schema(),
        ]
    }

    pub async fn create_resource(
        &self,
        type_name: &str,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        info!("creating resource {}", type_name);

        match type_name {
            "altus_disk" => DiskResource::create(&self.session, config).await,
            "altus_disk_snapshot" => SnapshotResource::create(&self.session, config).await,
            "altus_network" => NetworkResource::create(&self.session, config).await,
            "altus_load_balancer" => LoadBalancerResource::create(&self.session, config).await,
            "altus_integration" => IntegrationResource::create(&self.session, config).await,
            _ => Err(ProviderError::UnknownResourceType(type_name.to_string())),
        }
    }

    /// Refresh a resource from the platform. `Ok(None)` means the resource
    /// no longer exists and should drop out of state.
    pub async fn read_resource(
        &self,
        type_name: &str,
        state: &DynamicValue,
    ) -> Result<Option<DynamicValue>> {
        debug!("reading resource {}", type_name);

        let result = match type_name {
            "altus_disk" => DiskResource::read(&self.session, state).await,
            "altus_disk_snapshot" => SnapshotResource::read(&self.session, state).await,
            "altus_network" => NetworkResource::read(&self.session, state).await,
            "altus_load_balancer" => LoadBalancerResource::read(&self.session, state).await,
            "altus_integration" => IntegrationResource::read(&self.session, state).await,
            _ => return Err(ProviderError::UnknownResourceType(type_name.to_string())),
        };

        match result {
            Ok(state) => Ok(Some(state)),
            Err(ProviderError::Sdk(e)) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn update_resource(
        &self,
        type_name: &str,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        info!("updating resource {}", type_name);

        match type_name {
            "altus_disk" => DiskResource::update(&self.session, state, config).await,
            "altus_disk_snapshot" => SnapshotResource::update(&self.session, state, config).await,
            "altus_network" => NetworkResource::update(&self.session, state, config).await,
            "altus_load_balancer" => {
                LoadBalancerResource::update(&self.session, state, config).await
            }
            "altus_integration" => IntegrationResource::update(&self.session, state, config).await,
            _ => Err(ProviderError::UnknownResourceType(type_name.to_string())),
        }
    }

    pub async fn delete_resource(&self, type_name: &str, state: &DynamicValue) -> Result<()> {
        info!("deleting resource {}", type_name);

        match type_name {
            "altus_disk" => DiskResource::delete(&self.session, state).await,
            "altus_disk_snapshot" => SnapshotResource::delete(&self.session, state).await,
            "altus_network" => NetworkResource::delete(&self.session, state).await,
            "altus_load_balancer" => LoadBalancerResource::delete(&self.session, state).await,
            "altus_integration" => IntegrationResource::delete(&self.session, state).await,
            _ => Err(ProviderError::UnknownResourceType(type_name.to_string())),
        }
    }

    /// Import an existing platform resource by id, returning its full state.
    /// `Ok(None)` means nothing with that id exists.
    pub async fn import_resource(
        &self,
        type_name: &str,
        id: &str,
    ) -> Result<Option<DynamicValue>> {
        info!("importing resource {} with id {}", type_name, id);

        let seed = make_state(vec![("id", string_value(id))]);
        self.read_resource(type_name, &seed).await
    }

    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        debug!("reading data source {}", type_name);

        match type_name {
            "altus_disk" => DiskDataSource::read(&self.session, config).await,
            "altus_network" => NetworkDataSource::read(&self.session, config).await,
            "altus_load_balancer" => LoadBalancerDataSource::read(&self.session, config).await,
            "altus_integration" => IntegrationDataSource::read(&self.session, config).await,
            _ => Err(ProviderError::UnknownDataSourceType(type_name.to_string())),
        }
    }
}
