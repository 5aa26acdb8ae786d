//! Azure Resource Manager HTTP client

use std::sync::Arc;
use std::time::Duration;

use azure_models::models::ErrorResponse;
use reqwest::{header, Client, Method, Response};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::azure::credential::TokenProvider;
use crate::config::CloudEnvironment;
use crate::errors::DeployError;

pub const USER_AGENT: &str = concat!("ipam-deployer/", env!("CARGO_PKG_VERSION"));

/// ARM client scoped to one subscription
pub struct ArmClient {
    client: Client,
    cloud: CloudEnvironment,
    subscription_id: String,
    credential: Arc<dyn TokenProvider>,
    poll_interval: Duration,
}

impl ArmClient {
    /// Create a new ARM client
    pub fn new(
        cloud: CloudEnvironment,
        subscription_id: String,
        credential: Arc<dyn TokenProvider>,
    ) -> Result<Self, DeployError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            cloud,
            subscription_id,
            credential,
            poll_interval: Duration::from_secs(10),
        })
    }

    pub fn cloud(&self) -> CloudEnvironment {
        self.cloud
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn credential(&self) -> Arc<dyn TokenProvider> {
        self.credential.clone()
    }

    /// Absolute URL for an ARM path with its api-version
    pub fn url(&self, path: &str, api_version: &str) -> Result<Url, DeployError> {
        let mut url = Url::parse(self.cloud.arm_endpoint())
            .and_then(|base| base.join(path))
            .map_err(|e| DeployError::Internal(format!("Invalid ARM path {}: {}", path, e)))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T, DeployError> {
        self.send::<T, ()>(Method::GET, path, api_version, None).await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        self.send(Method::PUT, path, api_version, Some(body)).await
    }

    /// Make a POST request. ARM "list" actions take no body.
    pub async fn post<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T, DeployError> {
        self.send::<T, ()>(Method::POST, path, api_version, None).await
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&B>,
    ) -> Result<T, DeployError> {
        let url = self.url(path, api_version)?;
        debug!("{} {}", method, url);

        let token = self.credential.token(self.cloud.arm_endpoint()).await?;
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token.expose_secret()));

        request = match body {
            Some(body) => request.json(body),
            None => request.header(header::CONTENT_LENGTH, 0),
        };

        let response = check_status(request.send().await?, method.as_str()).await?;
        Ok(response.json().await?)
    }
}

/// Turn a non-success response into a transport error carrying the ARM message
pub async fn check_status(response: Response, what: &str) -> Result<Response, DeployError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| format!("{}: {}", e.error.code, e.error.message))
        .unwrap_or(body);

    error!("HTTP {} failed: {} - {}", what, status, message);
    Err(DeployError::TransportError(format!("{}: {}", status, message)))
}
