//! Deployment configuration document

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::filesys::file::File;

/// Key under which the engine secret is stored in the document
pub const ENGINE_SECRET_FIELD: &str = "engineSecret";

/// How the engine is delivered to the compute host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingMode {
    /// Container image built and pushed by an external pipeline
    #[default]
    Container,

    /// ZIP archive uploaded straight to the compute host
    Native,
}

/// The on-disk deployment document
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    /// Target Azure region
    #[serde(default)]
    pub location: Option<String>,

    /// Cloud environment selector
    #[serde(default = "default_cloud")]
    pub azure_cloud: String,

    /// Subscription to deploy into. Falls back to the Azure CLI context.
    #[serde(default)]
    pub subscription_id: Option<String>,

    /// Engine app registration client id
    #[serde(default)]
    pub engine_app_id: Option<String>,

    /// Engine app registration client secret
    #[serde(default)]
    pub engine_secret: Option<SecretString>,

    /// UI app registration client id
    #[serde(default)]
    pub ui_app_id: Option<String>,

    #[serde(default)]
    pub disable_ui: bool,

    #[serde(default)]
    pub packaging: PackagingMode,

    /// Deploy the engine as a Function App instead of an App Service
    #[serde(default)]
    pub function_app: bool,

    /// Concrete resource names keyed by role
    #[serde(default)]
    pub resource_names: BTreeMap<String, String>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Compiled ARM template, relative to the document
    #[serde(default = "default_template_file")]
    pub template_file: PathBuf,

    /// GitHub `owner/repo` publishing the engine archives
    #[serde(default = "default_release_repo")]
    pub release_repo: String,

    /// Principal to grant Key Vault access in the manual remediation notice
    #[serde(default)]
    pub operator_principal: Option<String>,
}

fn default_cloud() -> String {
    "AzureCloud".to_string()
}

fn default_template_file() -> PathBuf {
    PathBuf::from("main.json")
}

fn default_release_repo() -> String {
    "Azure/ipam".to_string()
}

impl DeployConfig {
    /// Load the document, mapping every failure to a configuration error
    pub async fn load(path: &Path) -> Result<Self, DeployError> {
        let file = File::new(path);
        if !file.exists().await {
            return Err(DeployError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        file.read_json::<DeployConfig>().await.map_err(|e| {
            DeployError::ConfigError(format!("Unable to read {}: {}", path.display(), e))
        })
    }
}
