//! API models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscription-scoped deployment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub location: String,
    pub properties: DeploymentRequestProperties,
}

/// Deployment request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequestProperties {
    pub mode: DeploymentMode,
    pub template: Value,
    pub parameters: BTreeMap<String, ParameterValue>,
}

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentMode {
    Incremental,
    Complete,
}

/// A single template parameter in `{ "value": ... }` form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub value: Value,
}

impl ParameterValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Deployment resource as returned by ARM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub properties: DeploymentResponseProperties,
}

/// Deployment status properties
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResponseProperties {
    pub provisioning_state: ProvisioningState,

    #[serde(default)]
    pub outputs: Option<BTreeMap<String, OutputValue>>,

    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// Provisioning state
///
/// Intermediate states (Accepted, Creating, Updating, ...) all collapse into
/// `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Running,
}

impl ProvisioningState {
    /// Whether no further automatic transition will occur
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProvisioningState::Running)
    }
}

/// Template output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputValue {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub value: Value,
}

/// ARM error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// ARM error envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Key Vault set-secret request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretSetRequest {
    pub value: String,
}

/// Key Vault secret bundle (only the fields we read)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretBundle {
    #[serde(default)]
    pub id: Option<String>,
}

/// App Service application settings dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Publishing (basic auth) credentials for a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingCredentials {
    pub properties: PublishingCredentialsProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishingCredentialsProperties {
    pub publishing_user_name: String,
    pub publishing_password: String,
    #[serde(default)]
    pub scm_uri: Option<String>,
}

/// GitHub release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// GitHub release asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}
