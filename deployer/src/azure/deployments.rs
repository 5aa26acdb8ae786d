//! Subscription-scoped ARM deployments

use async_trait::async_trait;
use azure_models::models::{DeploymentRequest, DeploymentResponse};
use tracing::{debug, info};

use crate::azure::client::ArmClient;
use crate::deploy::invoker::ProvisioningEngine;
use crate::errors::DeployError;

const DEPLOYMENTS_API_VERSION: &str = "2021-04-01";

impl ArmClient {
    fn deployment_path(&self, name: &str) -> String {
        format!(
            "/subscriptions/{}/providers/Microsoft.Resources/deployments/{}",
            self.subscription_id(),
            name
        )
    }

    /// Current status of a deployment
    pub async fn get_deployment(&self, name: &str) -> Result<DeploymentResponse, DeployError> {
        self.get(&self.deployment_path(name), DEPLOYMENTS_API_VERSION).await
    }
}

#[async_trait]
impl ProvisioningEngine for ArmClient {
    async fn deploy(
        &self,
        name: &str,
        request: &DeploymentRequest,
    ) -> Result<DeploymentResponse, DeployError> {
        let path = self.deployment_path(name);
        let mut response: DeploymentResponse =
            self.put(&path, DEPLOYMENTS_API_VERSION, request).await?;
        info!(
            "Deployment {} accepted ({:?})",
            name, response.properties.provisioning_state
        );

        while !response.properties.provisioning_state.is_terminal() {
            tokio::time::sleep(self.poll_interval()).await;
            response = self.get_deployment(name).await?;
            debug!(
                "Deployment {} is {:?}",
                name, response.properties.provisioning_state
            );
        }

        Ok(response)
    }
}
