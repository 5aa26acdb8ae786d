//! Merges the configuration document with command-line overrides

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::config::cloud::CloudEnvironment;
use crate::config::document::{DeployConfig, PackagingMode};
use crate::errors::DeployError;

/// Values supplied on the command line. Each one wins over the document.
#[derive(Debug, Default)]
pub struct Overrides {
    pub location: Option<String>,
    pub disable_ui: bool,
    pub native: bool,
    pub engine_secret: Option<SecretString>,
    pub subscription_id: Option<String>,
    pub archive_path: Option<PathBuf>,
}

/// Engine app registration identity
#[derive(Debug)]
pub struct EngineIdentity {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Fully resolved, read-only parameters for one run
#[derive(Debug)]
pub struct EffectiveConfig {
    pub location: String,
    pub cloud: CloudEnvironment,
    pub subscription_id: Option<String>,
    pub ui_enabled: bool,
    pub ui_app_id: Option<String>,
    pub packaging: PackagingMode,
    pub function_app: bool,
    pub resource_names: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
    pub engine: EngineIdentity,
    pub template_file: PathBuf,
    pub release_repo: String,
    pub archive_path: Option<PathBuf>,
    pub operator_principal: Option<String>,

    /// Document the settings came from
    pub config_path: PathBuf,

    /// Whether the document itself carries the plaintext engine secret
    pub document_holds_secret: bool,
}

impl EffectiveConfig {
    pub fn is_native(&self) -> bool {
        self.packaging == PackagingMode::Native
    }

    /// Concrete name for a resource role, if configured
    pub fn resource_name(&self, role: &str) -> Option<&str> {
        self.resource_names.get(role).map(String::as_str)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty_secret(value: Option<SecretString>) -> Option<SecretString> {
    value.filter(|s| !s.expose_secret().trim().is_empty())
}

/// Resolve the effective configuration. Pure apart from logging.
pub fn resolve(
    document: DeployConfig,
    config_path: &Path,
    overrides: Overrides,
) -> Result<EffectiveConfig, DeployError> {
    let client_id = non_empty(document.engine_app_id).ok_or_else(|| {
        DeployError::ConfigError("Missing engine app id (engineAppId)".to_string())
    })?;

    let document_secret = non_empty_secret(document.engine_secret);
    let document_holds_secret = document_secret.is_some();
    let client_secret = non_empty_secret(overrides.engine_secret)
        .or(document_secret)
        .ok_or_else(|| {
            DeployError::ConfigError(
                "Missing engine secret (engineSecret or --engine-secret)".to_string(),
            )
        })?;

    let cloud: CloudEnvironment = document.azure_cloud.parse()?;

    let location = non_empty(overrides.location)
        .or_else(|| non_empty(document.location))
        .ok_or_else(|| {
            DeployError::ConfigError("Missing deployment location (location or --location)".to_string())
        })?;

    if let Some((role, _)) = document
        .resource_names
        .iter()
        .find(|(_, name)| name.trim().is_empty())
    {
        return Err(DeployError::ConfigError(format!(
            "Resource name for role '{}' is empty",
            role
        )));
    }

    let packaging = if overrides.native {
        PackagingMode::Native
    } else {
        document.packaging
    };

    let ui_enabled = !(overrides.disable_ui || document.disable_ui);
    let ui_app_id = non_empty(document.ui_app_id);
    if ui_enabled && ui_app_id.is_none() {
        warn!("UI is enabled but no uiAppId is configured, the UI will not be able to sign users in");
    }

    let archive_path = overrides.archive_path;
    if archive_path.is_some() && packaging == PackagingMode::Container {
        warn!("Ignoring the supplied archive path, packaging mode is container");
    }

    let template_file = if document.template_file.is_absolute() {
        document.template_file
    } else {
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(document.template_file)
    };

    let config = EffectiveConfig {
        location,
        cloud,
        subscription_id: non_empty(overrides.subscription_id)
            .or_else(|| non_empty(document.subscription_id)),
        ui_enabled,
        ui_app_id,
        packaging,
        function_app: document.function_app,
        resource_names: document.resource_names,
        tags: document.tags,
        engine: EngineIdentity {
            client_id,
            client_secret,
        },
        template_file,
        release_repo: document.release_repo,
        archive_path,
        operator_principal: non_empty(document.operator_principal),
        config_path: config_path.to_path_buf(),
        document_holds_secret,
    };

    info!(
        location = %config.location,
        cloud = %config.cloud,
        ui_enabled = config.ui_enabled,
        packaging = ?config.packaging,
        function_app = config.function_app,
        engine_app_id = %config.engine.client_id,
        "Resolved deployment configuration"
    );

    Ok(config)
}
