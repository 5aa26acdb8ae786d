//! Moves the engine secret into Key Vault and out of the config document

use std::path::Path;

use async_trait::async_trait;
use colored::Colorize;
use secrecy::SecretString;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::document::ENGINE_SECRET_FIELD;
use crate::config::EffectiveConfig;
use crate::deploy::invoker::{DeploymentResult, OUTPUT_KEY_VAULT_NAME};
use crate::errors::DeployError;
use crate::filesys::file::File;

/// Fixed name of the engine secret in the vault
pub const ENGINE_SECRET_NAME: &str = "ENGINE-SECRET";

/// Resource role naming the Key Vault in the config document
pub const KEY_VAULT_ROLE: &str = "keyVault";

/// Secret storage backend
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn set_secret(
        &self,
        vault_name: &str,
        name: &str,
        value: &SecretString,
    ) -> Result<(), DeployError>;
}

/// What happened to the secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretOutcome {
    /// Stored; `scrubbed` tells whether the document was rewritten without it
    Stored { vault: String, scrubbed: bool },

    /// Not stored, the operator has to do it by hand
    ManualActionRequired { reason: String },
}

/// Writes the engine secret and degrades to manual remediation on failure
pub struct SecretPublisher<'a> {
    store: &'a dyn SecretStore,
}

impl<'a> SecretPublisher<'a> {
    pub fn new(store: &'a dyn SecretStore) -> Self {
        Self { store }
    }

    /// Never fails: a write failure becomes `ManualActionRequired`
    pub async fn publish(&self, config: &EffectiveConfig, deployment: &DeploymentResult) -> SecretOutcome {
        let vault = deployment
            .output(OUTPUT_KEY_VAULT_NAME)
            .or_else(|| config.resource_name(KEY_VAULT_ROLE));

        let Some(vault) = vault else {
            let e = DeployError::SecretStoreError(
                "No Key Vault name in deployment outputs or resource names".to_string(),
            );
            return manual_action(None, config, e);
        };

        info!("Storing {} in Key Vault {}", ENGINE_SECRET_NAME, vault);
        match self
            .store
            .set_secret(vault, ENGINE_SECRET_NAME, &config.engine.client_secret)
            .await
        {
            Ok(()) => {
                let scrubbed =
                    config.document_holds_secret && scrub_document(&config.config_path).await;
                SecretOutcome::Stored {
                    vault: vault.to_string(),
                    scrubbed,
                }
            }
            Err(e) => manual_action(Some(vault), config, e),
        }
    }
}

fn manual_action(vault: Option<&str>, config: &EffectiveConfig, e: DeployError) -> SecretOutcome {
    error!("Failed to store {}: {}", ENGINE_SECRET_NAME, e);
    print_manual_notice(vault, config.operator_principal.as_deref());
    SecretOutcome::ManualActionRequired {
        reason: e.to_string(),
    }
}

/// Remove the plaintext secret from the document. Best effort.
async fn scrub_document(path: &Path) -> bool {
    match remove_secret_field(path).await {
        Ok(removed) => {
            if removed {
                info!("Removed {} from {}", ENGINE_SECRET_FIELD, path.display());
            }
            removed
        }
        Err(e) => {
            warn!(
                "Secret stored, but {} could not be removed from {}: {}",
                ENGINE_SECRET_FIELD,
                path.display(),
                e
            );
            false
        }
    }
}

/// Rewrite the raw document without the secret field, keeping everything else
pub async fn remove_secret_field(path: &Path) -> Result<bool, DeployError> {
    let file = File::new(path);
    let mut document: Value = file.read_json().await?;

    let removed = document
        .as_object_mut()
        .and_then(|object| object.remove(ENGINE_SECRET_FIELD))
        .is_some();

    if removed {
        file.write_json_atomic(&document).await?;
    }
    Ok(removed)
}

fn print_manual_notice(vault: Option<&str>, principal: Option<&str>) {
    let vault = vault.unwrap_or("<ipam key vault>");
    let principal = principal.unwrap_or("the IPAM operations principal");

    eprintln!();
    eprintln!("{}", "[ACTION REQUIRED] The engine secret was NOT stored in Key Vault.".yellow().bold());
    eprintln!("  1. Store the engine app secret in Key Vault '{}' as '{}'.", vault, ENGINE_SECRET_NAME);
    eprintln!("  2. Grant {} the 'Key Vault Administrator' role on '{}'.", principal, vault);
    eprintln!("  3. Remove '{}' from the configuration file.", ENGINE_SECRET_FIELD);
    eprintln!();
}
