//! Subscription-scoped template deployment

use std::collections::BTreeMap;

use async_trait::async_trait;
use azure_models::models::{
    DeploymentMode, DeploymentRequest, DeploymentRequestProperties, DeploymentResponse,
    ParameterValue, ProvisioningState,
};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{error, info};

use crate::config::{EffectiveConfig, PackagingMode};
use crate::errors::DeployError;
use crate::filesys::file::File;

/// Prefix of every deployment name
pub const DEPLOYMENT_NAME_PREFIX: &str = "ipamInfraDeploy";

/// Output naming the App Service
pub const OUTPUT_APP_SERVICE_NAME: &str = "appServiceName";
/// Output naming the Function App
pub const OUTPUT_FUNCTION_APP_NAME: &str = "functionAppName";
/// Output with the public host name of the compute resource
pub const OUTPUT_HOST_NAME: &str = "appServiceHostName";
/// Output naming the resource group holding everything else
pub const OUTPUT_RESOURCE_GROUP: &str = "resourceGroupName";
/// Output naming the Key Vault
pub const OUTPUT_KEY_VAULT_NAME: &str = "keyVaultName";

/// Declarative provisioning engine at subscription scope
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Submit the deployment and wait until it reaches a terminal state
    async fn deploy(
        &self,
        name: &str,
        request: &DeploymentRequest,
    ) -> Result<DeploymentResponse, DeployError>;
}

/// Outcome of one template submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResult {
    pub id: String,
    pub state: ProvisioningState,
    pub outputs: BTreeMap<String, String>,
}

impl DeploymentResult {
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    fn from_response(response: DeploymentResponse) -> Self {
        let outputs = response
            .properties
            .outputs
            .unwrap_or_default()
            .into_iter()
            .map(|(key, output)| {
                let value = match output.value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();

        Self {
            id: response.id.unwrap_or(response.name),
            state: response.properties.provisioning_state,
            outputs,
        }
    }
}

/// Deployment name unique to the second
pub fn deployment_name(now: DateTime<Utc>) -> String {
    format!("{}-{}", DEPLOYMENT_NAME_PREFIX, now.format("%Y%m%d%H%M%S"))
}

/// Template parameters for the effective configuration
pub fn build_parameters(config: &EffectiveConfig) -> BTreeMap<String, ParameterValue> {
    let ui_app_id = if config.ui_enabled {
        config.ui_app_id.clone().unwrap_or_default()
    } else {
        String::new()
    };

    let mut parameters = BTreeMap::new();
    parameters.insert("location".to_string(), ParameterValue::new(config.location.clone()));
    parameters.insert("azureCloud".to_string(), ParameterValue::new(config.cloud.name()));
    parameters.insert(
        "engineAppId".to_string(),
        ParameterValue::new(config.engine.client_id.clone()),
    );
    parameters.insert(
        "engineAppSecret".to_string(),
        ParameterValue::new(config.engine.client_secret.expose_secret()),
    );
    parameters.insert("uiAppId".to_string(), ParameterValue::new(ui_app_id));
    parameters.insert("deployAsFunc".to_string(), ParameterValue::new(config.function_app));
    parameters.insert(
        "deployAsContainer".to_string(),
        ParameterValue::new(config.packaging == PackagingMode::Container),
    );
    parameters.insert(
        "resourceNames".to_string(),
        ParameterValue::new(serde_json::to_value(&config.resource_names).unwrap_or_default()),
    );
    parameters.insert(
        "tags".to_string(),
        ParameterValue::new(serde_json::to_value(&config.tags).unwrap_or_default()),
    );
    parameters
}

/// Submits the template and insists on success
pub struct TemplateInvoker<'a> {
    engine: &'a dyn ProvisioningEngine,
}

impl<'a> TemplateInvoker<'a> {
    pub fn new(engine: &'a dyn ProvisioningEngine) -> Self {
        Self { engine }
    }

    /// Deploy the infrastructure template. Any non-success outcome is fatal.
    pub async fn invoke(&self, config: &EffectiveConfig) -> Result<DeploymentResult, DeployError> {
        let template: Value = File::new(&config.template_file)
            .read_json()
            .await
            .map_err(|e| {
                DeployError::ConfigError(format!(
                    "Unable to read template {}: {}",
                    config.template_file.display(),
                    e
                ))
            })?;

        let name = deployment_name(Utc::now());
        let request = DeploymentRequest {
            location: config.location.clone(),
            properties: DeploymentRequestProperties {
                mode: DeploymentMode::Incremental,
                template,
                parameters: build_parameters(config),
            },
        };

        info!("Submitting deployment {} to {}", name, config.location);
        let response = self.engine.deploy(&name, &request).await.map_err(|e| match e {
            DeployError::DeploymentError(_) => e,
            other => DeployError::DeploymentError(format!("Submission of {} failed: {}", name, other)),
        })?;

        let detail = response
            .properties
            .error
            .as_ref()
            .map(|e| format!(" ({}: {})", e.code, e.message))
            .unwrap_or_default();
        let result = DeploymentResult::from_response(response);

        match result.state {
            ProvisioningState::Succeeded => {
                info!("Deployment {} succeeded", name);
                Ok(result)
            }
            state => {
                error!("Deployment {} finished as {:?}{}", name, state, detail);
                Err(DeployError::DeploymentError(format!(
                    "Deployment {} finished as {:?}{}",
                    name, state, detail
                )))
            }
        }
    }
}
