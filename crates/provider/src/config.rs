//! Provider and per-resource configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, Result};
use crate::state::{decode_config, DynamicValue};
use crate::wait::{DEFAULT_OPERATION_TIMEOUT, DEFAULT_POLL_INTERVAL};

/// Provider-level configuration, decoded and validated once at configure
/// time. Handlers never touch raw configuration again after this.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the platform, e.g. `https://altus.example.com`.
    pub url: String,
    /// Refresh token exchanged for a bearer token at login.
    pub refresh_token: String,
    /// Poll interval override in seconds for request tracking. Meant for
    /// test harnesses; production configurations leave this unset (5s).
    #[serde(default)]
    pub poll_interval_seconds: Option<u64>,
}

impl ProviderConfig {
    /// Decode a provider configuration block.
    pub fn from_state(value: &DynamicValue) -> Result<Self> {
        decode_config(value)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "url must not be empty".to_string(),
            ));
        }
        if self.refresh_token.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "refresh_token must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval between request-tracker polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }
}

/// Per-resource operation deadlines, in minutes. Unset entries fall back
/// to the five-minute default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OperationTimeouts {
    #[serde(default)]
    pub create: Option<u64>,
    #[serde(default)]
    pub update: Option<u64>,
    #[serde(default)]
    pub delete: Option<u64>,
}

impl OperationTimeouts {
    /// Read the optional `timeouts` attribute of a config or state map.
    pub fn from_attr(value: &DynamicValue) -> Result<Self> {
        match value.get("timeouts") {
            Some(attr) if !matches!(attr, DynamicValue::Null) => decode_config(attr),
            _ => Ok(Self::default()),
        }
    }

    pub fn create_timeout(&self) -> Duration {
        Self::minutes(self.create)
    }

    pub fn update_timeout(&self) -> Duration {
        Self::minutes(self.update)
    }

    pub fn delete_timeout(&self) -> Duration {
        Self::minutes(self.delete)
    }

    fn minutes(value: Option<u64>) -> Duration {
        value
            .map(|m| Duration::from_secs(m * 60))
            .unwrap_or(DEFAULT_OPERATION_TIMEOUT)
    }
}
