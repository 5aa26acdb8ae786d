//! App Service / Function App settings and ZIP publishing transports

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use azure_models::models::{AppSettings, PublishingCredentials};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::azure::client::{check_status, ArmClient, USER_AGENT};
use crate::config::CloudEnvironment;
use crate::deploy::publisher::{ComputeTarget, PublishTransport, SiteConfigurator, TransportKind};
use crate::errors::DeployError;
use crate::filesys::file::File;

const WEB_API_VERSION: &str = "2022-03-01";

/// Upper bound on a single control-endpoint upload
pub const ZIP_DEPLOY_TIMEOUT: Duration = Duration::from_secs(1800);

/// Basic credentials for the control endpoint
pub struct PublishingProfile {
    pub user_name: String,
    pub password: SecretString,
}

impl PublishingProfile {
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.user_name, self.password.expose_secret());
        format!("Basic {}", BASE64.encode(raw))
    }
}

/// Kudu (SCM) base URL of a site
pub fn scm_base_url(cloud: CloudEnvironment, site: &str) -> String {
    format!("https://{}.{}", site, cloud.scm_suffix())
}

impl ArmClient {
    fn site_path(&self, target: &ComputeTarget) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/sites/{}",
            self.subscription_id(),
            target.resource_group,
            target.name
        )
    }

    /// Basic credentials from the publishing-credentials lookup
    pub async fn publishing_credentials(&self, target: &ComputeTarget) -> Result<PublishingProfile, DeployError> {
        let path = format!("{}/config/publishingcredentials/list", self.site_path(target));
        let credentials: PublishingCredentials = self.post(&path, WEB_API_VERSION).await?;

        Ok(PublishingProfile {
            user_name: credentials.properties.publishing_user_name,
            password: credentials.properties.publishing_password.into(),
        })
    }
}

#[async_trait]
impl SiteConfigurator for ArmClient {
    async fn app_settings(&self, target: &ComputeTarget) -> Result<BTreeMap<String, String>, DeployError> {
        let path = format!("{}/config/appsettings/list", self.site_path(target));
        let settings: AppSettings = self.post(&path, WEB_API_VERSION).await?;
        Ok(settings.properties)
    }

    async fn update_app_settings(
        &self,
        target: &ComputeTarget,
        settings: &BTreeMap<String, String>,
    ) -> Result<(), DeployError> {
        let path = format!("{}/config/appsettings", self.site_path(target));
        let body = AppSettings {
            properties: settings.clone(),
        };
        let _: AppSettings = self.put(&path, WEB_API_VERSION, &body).await?;
        Ok(())
    }
}

/// Managed deployment API (`/api/publish`), authenticated with an ARM token.
/// Restarts the site and cleans the target directory.
pub struct OneDeployTransport {
    client: Client,
    arm: Arc<ArmClient>,
}

impl OneDeployTransport {
    pub fn new(arm: Arc<ArmClient>) -> Result<Self, DeployError> {
        Ok(Self {
            client: Client::builder().user_agent(USER_AGENT).build()?,
            arm,
        })
    }
}

#[async_trait]
impl PublishTransport for OneDeployTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Primary
    }

    async fn upload(&self, target: &ComputeTarget, archive: &File) -> Result<(), DeployError> {
        let url = format!(
            "{}/api/publish?type=zip&restart=true&clean=true",
            scm_base_url(self.arm.cloud(), &target.name)
        );
        debug!("POST {}", url);

        let token = self.arm.credential().token(self.arm.cloud().arm_endpoint()).await?;
        let body = archive.read_bytes().await?;

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            .header(header::CONTENT_TYPE, "application/zip")
            .body(body)
            .send()
            .await
            .map_err(|e| DeployError::TransportError(e.to_string()))?;

        check_status(response, "POST publish").await?;
        Ok(())
    }
}

/// Direct upload to the control endpoint (`/api/zipdeploy`) with basic
/// credentials, bounded by [`ZIP_DEPLOY_TIMEOUT`]
pub struct ZipDeployTransport {
    client: Client,
    arm: Arc<ArmClient>,
}

impl ZipDeployTransport {
    pub fn new(arm: Arc<ArmClient>) -> Result<Self, DeployError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(ZIP_DEPLOY_TIMEOUT)
            .build()?;
        Ok(Self { client, arm })
    }
}

#[async_trait]
impl PublishTransport for ZipDeployTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Fallback
    }

    async fn upload(&self, target: &ComputeTarget, archive: &File) -> Result<(), DeployError> {
        let profile = self.arm.publishing_credentials(target).await?;
        let url = format!("{}/api/zipdeploy", scm_base_url(self.arm.cloud(), &target.name));
        debug!("POST {} as {}", url, profile.user_name);

        let body = archive.read_bytes().await?;
        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, profile.basic_auth_header())
            .header(header::CONTENT_TYPE, "application/zip")
            .body(body)
            .send()
            .await
            .map_err(|e| DeployError::TransportError(e.to_string()))?;

        check_status(response, "POST zipdeploy").await?;
        Ok(())
    }
}
