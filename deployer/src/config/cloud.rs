//! Azure cloud environments and their endpoints

use std::fmt;
use std::str::FromStr;

use crate::errors::DeployError;

/// Supported Azure cloud environments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloudEnvironment {
    #[default]
    AzureCloud,
    AzureUsGovernment,
    AzureChinaCloud,
}

impl CloudEnvironment {
    /// Name as the template and the Azure CLI spell it
    pub fn name(&self) -> &'static str {
        match self {
            CloudEnvironment::AzureCloud => "AzureCloud",
            CloudEnvironment::AzureUsGovernment => "AzureUSGovernment",
            CloudEnvironment::AzureChinaCloud => "AzureChinaCloud",
        }
    }

    /// Resource Manager endpoint, also the token audience for ARM and Kudu
    pub fn arm_endpoint(&self) -> &'static str {
        match self {
            CloudEnvironment::AzureCloud => "https://management.azure.com",
            CloudEnvironment::AzureUsGovernment => "https://management.usgovcloudapi.net",
            CloudEnvironment::AzureChinaCloud => "https://management.chinacloudapi.cn",
        }
    }

    /// Key Vault DNS suffix
    pub fn key_vault_suffix(&self) -> &'static str {
        match self {
            CloudEnvironment::AzureCloud => "vault.azure.net",
            CloudEnvironment::AzureUsGovernment => "vault.usgovcloudapi.net",
            CloudEnvironment::AzureChinaCloud => "vault.azure.cn",
        }
    }

    /// Token audience for Key Vault data plane calls
    pub fn key_vault_audience(&self) -> String {
        format!("https://{}", self.key_vault_suffix())
    }

    /// App Service SCM (Kudu) DNS suffix
    pub fn scm_suffix(&self) -> &'static str {
        match self {
            CloudEnvironment::AzureCloud => "scm.azurewebsites.net",
            CloudEnvironment::AzureUsGovernment => "scm.azurewebsites.us",
            CloudEnvironment::AzureChinaCloud => "scm.chinacloudsites.cn",
        }
    }
}

impl fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CloudEnvironment {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            CloudEnvironment::AzureCloud,
            CloudEnvironment::AzureUsGovernment,
            CloudEnvironment::AzureChinaCloud,
        ]
        .into_iter()
        .find(|cloud| cloud.name().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| {
            DeployError::ConfigError(format!(
                "Unsupported Azure cloud '{}', expected AzureCloud, AzureUSGovernment or AzureChinaCloud",
                s
            ))
        })
    }
}
