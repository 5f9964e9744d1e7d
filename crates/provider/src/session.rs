//! Shared handler context

use std::time::Duration;

use altus_sdk::ApiClient;

use crate::wait::WaitOptions;

/// Configured API client plus polling policy, handed to every resource and
/// data-source handler. Built once when the provider is configured and
/// read-only afterwards.
#[derive(Debug)]
pub struct Session {
    client: ApiClient,
    poll_interval: Duration,
}

impl Session {
    pub fn new(client: ApiClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Wait options for one tracked request with the given deadline.
    pub fn wait_options(&self, timeout: Duration) -> WaitOptions {
        WaitOptions {
            poll_interval: self.poll_interval,
            timeout,
        }
    }
}
