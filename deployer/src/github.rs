//! GitHub release client

use async_trait::async_trait;
use azure_models::models::{Release, ReleaseAsset};
use reqwest::{header, Client};
use tracing::{debug, error};

use crate::azure::client::USER_AGENT;
use crate::deploy::fetcher::ReleaseSource;
use crate::errors::DeployError;
use crate::filesys::file::File;

/// HTTP client for the GitHub releases API
pub struct GitHubReleases {
    client: Client,
    base_url: String,
}

impl GitHubReleases {
    /// Create a new client against api.github.com
    pub fn new() -> Result<Self, DeployError> {
        Self::with_base_url("https://api.github.com")
    }

    /// Create a new client against another API root (GitHub Enterprise)
    pub fn with_base_url(base_url: &str) -> Result<Self, DeployError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn latest_release_url(&self, repo: &str) -> String {
        format!("{}/repos/{}/releases/latest", self.base_url, repo.trim_matches('/'))
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleases {
    async fn latest_release(&self, repo: &str) -> Result<Release, DeployError> {
        let url = self.latest_release_url(repo);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP GET failed: {} - {}", status, body);
            return Err(DeployError::ArtifactFetchError(format!(
                "Release lookup for {} failed: {}",
                repo, status
            )));
        }

        Ok(response.json().await?)
    }

    async fn download(&self, asset: &ReleaseAsset, destination: &File) -> Result<(), DeployError> {
        debug!("GET {}", asset.browser_download_url);

        let response = self
            .client
            .get(&asset.browser_download_url)
            .header(header::ACCEPT, "application/octet-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Asset download failed: {}", status);
            return Err(DeployError::ArtifactFetchError(format!(
                "Download of {} failed: {}",
                asset.name, status
            )));
        }

        let bytes = response.bytes().await?;
        destination.write_bytes(&bytes).await
    }
}
