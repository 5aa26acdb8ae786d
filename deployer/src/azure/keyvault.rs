//! Key Vault secret writes

use std::sync::Arc;

use async_trait::async_trait;
use azure_models::models::{SecretBundle, SecretSetRequest};
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::azure::client::{check_status, USER_AGENT};
use crate::azure::credential::TokenProvider;
use crate::config::CloudEnvironment;
use crate::deploy::secrets::SecretStore;
use crate::errors::DeployError;

const KEY_VAULT_API_VERSION: &str = "7.4";

/// Key Vault data plane client
pub struct KeyVaultClient {
    client: Client,
    cloud: CloudEnvironment,
    credential: Arc<dyn TokenProvider>,
}

impl KeyVaultClient {
    pub fn new(cloud: CloudEnvironment, credential: Arc<dyn TokenProvider>) -> Result<Self, DeployError> {
        Ok(Self {
            client: Client::builder().user_agent(USER_AGENT).build()?,
            cloud,
            credential,
        })
    }

    pub fn secret_url(&self, vault_name: &str, name: &str) -> String {
        format!(
            "https://{}.{}/secrets/{}?api-version={}",
            vault_name,
            self.cloud.key_vault_suffix(),
            name,
            KEY_VAULT_API_VERSION
        )
    }

    async fn put_secret(&self, vault_name: &str, name: &str, value: &SecretString) -> Result<(), DeployError> {
        let url = self.secret_url(vault_name, name);
        debug!("PUT {}", url);

        let token = self.credential.token(&self.cloud.key_vault_audience()).await?;
        let body = SecretSetRequest {
            value: value.expose_secret().to_string(),
        };

        let response = self
            .client
            .put(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let bundle: SecretBundle = check_status(response, "PUT secret").await?.json().await?;
        debug!("Secret version {}", bundle.id.unwrap_or_default());
        Ok(())
    }
}

#[async_trait]
impl SecretStore for KeyVaultClient {
    async fn set_secret(&self, vault_name: &str, name: &str, value: &SecretString) -> Result<(), DeployError> {
        self.put_secret(vault_name, name, value)
            .await
            .map_err(|e| DeployError::SecretStoreError(format!("{}/{}: {}", vault_name, name, e)))
    }
}
