//! Client for the Altus IaaS REST API

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{
    AuthRequest, AuthResponse, Disk, DiskSpec, Integration, IntegrationSpec, LoadBalancer,
    LoadBalancerSpec, Network, NetworkSpec, ResultPage, Snapshot, SnapshotSpec,
};
use crate::tracker::{RequestTracker, TrackRequests};

/// Client wrapper for the platform's `/iaas/api` surface.
///
/// Every mutating method returns the [`RequestTracker`] the platform answers
/// with; callers poll that tracker until the operation is terminal.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Exchange a refresh token for a bearer token and build a client.
    pub async fn connect(base_url: &str, refresh_token: &str) -> Result<Self> {
        let http = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let response = http
            .post(format!("{base_url}/iaas/api/login"))
            .json(&AuthRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "login rejected with {}: {}",
                status.as_u16(),
                message
            )));
        }

        let auth: AuthResponse = Self::expect_json(response).await?;
        if auth.token.is_empty() {
            return Err(Error::Auth("login returned an empty token".to_string()));
        }

        debug!("authenticated against {}", base_url);
        Ok(Self {
            http,
            base_url,
            token: auth.token,
        })
    }

    /// Build a client around an already-issued bearer token.
    pub fn with_token(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Base URL the client was built against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_resource<T: DeserializeOwned>(
        &self,
        path: &str,
        kind: &str,
        id: &str,
    ) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        Self::expect_json(response).await
    }

    async fn delete_resource(&self, path: &str, kind: &str, id: &str) -> Result<RequestTracker> {
        let response = self.request(Method::DELETE, path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        Self::expect_json(response).await
    }

    async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        name: Option<&str>,
    ) -> Result<ResultPage<T>> {
        let mut request = self.request(Method::GET, path);
        if let Some(name) = name {
            request = request.query(&[("$filter", format!("name eq '{name}'"))]);
        }
        Self::expect_json(request.send().await?).await
    }

    // Request tracking

    pub async fn get_request_tracker(&self, id: &str) -> Result<RequestTracker> {
        let response = self
            .request(Method::GET, &format!("/iaas/api/request-tracker/{id}"))
            .send()
            .await?;
        Self::expect_json(response).await
    }

    // Block device operations

    pub async fn create_disk(&self, spec: &DiskSpec) -> Result<RequestTracker> {
        debug!("creating block device {}", spec.name);
        let response = self
            .request(Method::POST, "/iaas/api/block-devices")
            .json(spec)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    pub async fn get_disk(&self, id: &str) -> Result<Disk> {
        self.get_resource(&format!("/iaas/api/block-devices/{id}"), "block device", id)
            .await
    }

    pub async fn list_disks(&self, name: Option<&str>) -> Result<ResultPage<Disk>> {
        self.list("/iaas/api/block-devices", name).await
    }

    pub async fn resize_disk(&self, id: &str, capacity_in_gb: i64) -> Result<RequestTracker> {
        debug!("resizing block device {} to {}GB", id, capacity_in_gb);
        let response = self
            .request(Method::POST, &format!("/iaas/api/block-devices/{id}"))
            .query(&[
                ("action", "resize".to_string()),
                ("capacityInGB", capacity_in_gb.to_string()),
            ])
            .send()
            .await?;
        Self::expect_json(response).await
    }

    pub async fn delete_disk(&self, id: &str) -> Result<RequestTracker> {
        debug!("deleting block device {}", id);
        self.delete_resource(&format!("/iaas/api/block-devices/{id}"), "block device", id)
            .await
    }

    // Snapshot operations

    pub async fn create_snapshot(
        &self,
        disk_id: &str,
        spec: &SnapshotSpec,
    ) -> Result<RequestTracker> {
        debug!("snapshotting block device {}", disk_id);
        let response = self
            .request(
                Method::POST,
                &format!("/iaas/api/block-devices/{disk_id}/snapshots"),
            )
            .json(spec)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    pub async fn get_snapshot(&self, disk_id: &str, id: &str) -> Result<Snapshot> {
        self.get_resource(
            &format!("/iaas/api/block-devices/{disk_id}/snapshots/{id}"),
            "snapshot",
            id,
        )
        .await
    }

    pub async fn delete_snapshot(&self, disk_id: &str, id: &str) -> Result<RequestTracker> {
        self.delete_resource(
            &format!("/iaas/api/block-devices/{disk_id}/snapshots/{id}"),
            "snapshot",
            id,
        )
        .await
    }

    // Network operations

    pub async fn create_network(&self, spec: &NetworkSpec) -> Result<RequestTracker> {
        debug!("creating network {}", spec.name);
        let response = self
            .request(Method::POST, "/iaas/api/networks")
            .json(spec)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    pub async fn get_network(&self, id: &str) -> Result<Network> {
        self.get_resource(&format!("/iaas/api/networks/{id}"), "network", id)
            .await
    }

    pub async fn list_networks(&self, name: Option<&str>) -> Result<ResultPage<Network>> {
        self.list("/iaas/api/networks", name).await
    }

    pub async fn delete_network(&self, id: &str) -> Result<RequestTracker> {
        debug!("deleting network {}", id);
        self.delete_resource(&format!("/iaas/api/networks/{id}"), "network", id)
            .await
    }

    // Load balancer operations

    pub async fn create_load_balancer(&self, spec: &LoadBalancerSpec) -> Result<RequestTracker> {
        debug!("creating load balancer {}", spec.name);
        let response = self
            .request(Method::POST, "/iaas/api/load-balancers")
            .json(spec)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    pub async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer> {
        self.get_resource(&format!("/iaas/api/load-balancers/{id}"), "load balancer", id)
            .await
    }

    pub async fn list_load_balancers(&self, name: Option<&str>) -> Result<ResultPage<LoadBalancer>> {
        self.list("/iaas/api/load-balancers", name).await
    }

    pub async fn scale_load_balancer(
        &self,
        id: &str,
        spec: &LoadBalancerSpec,
    ) -> Result<RequestTracker> {
        debug!("scaling load balancer {}", id);
        let response = self
            .request(Method::POST, &format!("/iaas/api/load-balancers/{id}"))
            .query(&[("action", "scale")])
            .json(spec)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    pub async fn delete_load_balancer(&self, id: &str) -> Result<RequestTracker> {
        debug!("deleting load balancer {}", id);
        self.delete_resource(&format!("/iaas/api/load-balancers/{id}"), "load balancer", id)
            .await
    }

    // Integration operations

    pub async fn create_integration(&self, spec: &IntegrationSpec) -> Result<RequestTracker> {
        debug!("creating integration {}", spec.name);
        let response = self
            .request(Method::POST, "/iaas/api/integrations")
            .json(spec)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    pub async fn get_integration(&self, id: &str) -> Result<Integration> {
        self.get_resource(&format!("/iaas/api/integrations/{id}"), "integration", id)
            .await
    }

    pub async fn list_integrations(&self, name: Option<&str>) -> Result<ResultPage<Integration>> {
        self.list("/iaas/api/integrations", name).await
    }

    pub async fn update_integration(
        &self,
        id: &str,
        spec: &IntegrationSpec,
    ) -> Result<RequestTracker> {
        debug!("updating integration {}", id);
        let response = self
            .request(Method::PATCH, &format!("/iaas/api/integrations/{id}"))
            .json(spec)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    pub async fn delete_integration(&self, id: &str) -> Result<RequestTracker> {
        debug!("deleting integration {}", id);
        self.delete_resource(&format!("/iaas/api/integrations/{id}"), "integration", id)
            .await
    }
}

#[async_trait]
impl TrackRequests for ApiClient {
    async fn track(&self, request_id: &str) -> Result<RequestTracker> {
        self.get_request_tracker(request_id).await
    }
}
