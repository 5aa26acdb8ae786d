//! External collaborators of the flow

use std::sync::Arc;

use tracing::info;

use crate::azure::keyvault::KeyVaultClient;
use crate::azure::webapps::{OneDeployTransport, ZipDeployTransport};
use crate::azure::{ArmClient, AzureCliCredential, TokenProvider};
use crate::config::EffectiveConfig;
use crate::deploy::fetcher::ReleaseSource;
use crate::deploy::invoker::ProvisioningEngine;
use crate::deploy::publisher::{PublishTransport, SiteConfigurator};
use crate::deploy::secrets::SecretStore;
use crate::errors::DeployError;
use crate::github::GitHubReleases;

/// Borrowed view of every external boundary the flow talks to
pub struct Services<'a> {
    pub engine: &'a dyn ProvisioningEngine,
    pub secrets: &'a dyn SecretStore,
    pub releases: &'a dyn ReleaseSource,
    pub site: &'a dyn SiteConfigurator,
    pub primary: &'a dyn PublishTransport,
    pub fallback: &'a dyn PublishTransport,
}

/// Real Azure and GitHub clients
pub struct AzureServices {
    arm: Arc<ArmClient>,
    key_vault: KeyVaultClient,
    releases: GitHubReleases,
    one_deploy: OneDeployTransport,
    zip_deploy: ZipDeployTransport,
}

impl AzureServices {
    /// Build clients from the Azure CLI login
    pub async fn connect(config: &EffectiveConfig) -> Result<Self, DeployError> {
        let cli = Arc::new(AzureCliCredential::new());

        let subscription_id = match &config.subscription_id {
            Some(id) => id.clone(),
            None => cli.current_subscription().await?,
        };
        info!("Using subscription {}", subscription_id);

        let credential: Arc<dyn TokenProvider> = cli;
        let arm = Arc::new(ArmClient::new(config.cloud, subscription_id, credential.clone())?);

        Ok(Self {
            key_vault: KeyVaultClient::new(config.cloud, credential)?,
            releases: GitHubReleases::new()?,
            one_deploy: OneDeployTransport::new(arm.clone())?,
            zip_deploy: ZipDeployTransport::new(arm.clone())?,
            arm,
        })
    }

    pub fn services(&self) -> Services<'_> {
        Services {
            engine: self.arm.as_ref(),
            secrets: &self.key_vault,
            releases: &self.releases,
            site: self.arm.as_ref(),
            primary: &self.one_deploy,
            fallback: &self.zip_deploy,
        }
    }
}
