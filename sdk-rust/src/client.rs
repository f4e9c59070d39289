use crate::{
    client_utils,
    config::{ClientConfig, Endpoint},
    errors::SynapseResult,
    types::HealthStatus,
};
use reqwest::{multipart::Form, Client};
use serde::{de::DeserializeOwned, Serialize};

/// Thin wrapper binding a `reqwest` client to the backend's base URL.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Resolve the base URL from the environment.
    ///
    /// # Errors
    /// Returns an error when the `SYNAPSE_API_URL` override is malformed.
    pub fn from_env() -> SynapseResult<Self> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) async fn post_json<T, R>(&self, endpoint: Endpoint, body: &T) -> SynapseResult<R>
    where
        T: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        client_utils::send_json(&self.client, &self.config.url(endpoint), body).await
    }

    pub(crate) async fn post_multipart<R: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        form: Form,
    ) -> SynapseResult<R> {
        client_utils::send_multipart(&self.client, &self.config.url(endpoint), form).await
    }

    pub(crate) async fn post_empty(&self, endpoint: Endpoint) -> SynapseResult<()> {
        client_utils::send_empty(&self.client, &self.config.url(endpoint)).await
    }

    /// Ping the backend root.
    ///
    /// # Errors
    /// Returns the normalized error when the backend is unreachable or unhealthy.
    pub async fn health(&self) -> SynapseResult<HealthStatus> {
        client_utils::get_json(&self.client, &self.config.url(Endpoint::Health)).await
    }
}
