//! Shared fakes for the flow tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use azure_models::models::{
    DeploymentRequest, DeploymentResponse, DeploymentResponseProperties, OutputValue,
    ProvisioningState, Release, ReleaseAsset,
};
use secrecy::{ExposeSecret, SecretString};

use ipam_deployer::app::options::RunOptions;
use ipam_deployer::app::services::Services;
use ipam_deployer::config::{resolve, DeployConfig, EffectiveConfig, Overrides};
use ipam_deployer::deploy::fetcher::ReleaseSource;
use ipam_deployer::deploy::fsm::FsmSettings;
use ipam_deployer::deploy::invoker::ProvisioningEngine;
use ipam_deployer::deploy::publisher::{ComputeTarget, PublishTransport, SiteConfigurator, TransportKind};
use ipam_deployer::deploy::secrets::SecretStore;
use ipam_deployer::errors::DeployError;
use ipam_deployer::filesys::file::File;

pub struct FakeEngine {
    pub state: ProvisioningState,
    pub outputs: BTreeMap<String, String>,
    pub calls: AtomicU32,
    pub last_request: Mutex<Option<(String, DeploymentRequest)>>,
}

impl FakeEngine {
    pub fn succeeding() -> Self {
        Self::with_state(ProvisioningState::Succeeded)
    }

    pub fn with_state(state: ProvisioningState) -> Self {
        let outputs = BTreeMap::from([
            ("appServiceName".to_string(), "ipam-app".to_string()),
            ("appServiceHostName".to_string(), "ipam-app.azurewebsites.net".to_string()),
            ("resourceGroupName".to_string(), "ipam-rg".to_string()),
            ("keyVaultName".to_string(), "ipam-kv".to_string()),
        ]);
        Self {
            state,
            outputs,
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvisioningEngine for FakeEngine {
    async fn deploy(&self, name: &str, request: &DeploymentRequest) -> Result<DeploymentResponse, DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((name.to_string(), request.clone()));

        let outputs = self
            .outputs
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    OutputValue {
                        kind: Some("String".to_string()),
                        value: serde_json::Value::String(v.clone()),
                    },
                )
            })
            .collect();

        Ok(DeploymentResponse {
            id: Some(format!("/subscriptions/sub/providers/Microsoft.Resources/deployments/{}", name)),
            name: name.to_string(),
            properties: DeploymentResponseProperties {
                provisioning_state: self.state,
                outputs: Some(outputs),
                error: None,
            },
        })
    }
}

#[derive(Default)]
pub struct FakeSecretStore {
    pub fail: bool,
    pub writes: Mutex<Vec<(String, String, String)>>,
}

impl FakeSecretStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn set_secret(&self, vault_name: &str, name: &str, value: &SecretString) -> Result<(), DeployError> {
        if self.fail {
            return Err(DeployError::SecretStoreError("403 Forbidden".to_string()));
        }
        self.writes.lock().unwrap().push((
            vault_name.to_string(),
            name.to_string(),
            value.expose_secret().to_string(),
        ));
        Ok(())
    }
}

pub struct FakeReleases {
    pub asset_names: Vec<String>,
    pub lookups: AtomicU32,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeReleases {
    pub fn with_assets(names: &[&str]) -> Self {
        Self {
            asset_names: names.iter().map(|n| n.to_string()).collect(),
            lookups: AtomicU32::new(0),
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReleaseSource for FakeReleases {
    async fn latest_release(&self, _repo: &str) -> Result<Release, DeployError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(Release {
            tag_name: "v3.4.0".to_string(),
            name: None,
            assets: self
                .asset_names
                .iter()
                .map(|name| ReleaseAsset {
                    name: name.clone(),
                    browser_download_url: format!("https://example.invalid/{}", name),
                    size: 3,
                })
                .collect(),
        })
    }

    async fn download(&self, asset: &ReleaseAsset, destination: &File) -> Result<(), DeployError> {
        self.downloads.lock().unwrap().push(asset.name.clone());
        destination.write_bytes(b"zip").await
    }
}

#[derive(Default)]
pub struct FakeSite {
    pub settings: Mutex<BTreeMap<String, String>>,
    pub updates: AtomicU32,
}

impl FakeSite {
    pub fn updates(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteConfigurator for FakeSite {
    async fn app_settings(&self, _target: &ComputeTarget) -> Result<BTreeMap<String, String>, DeployError> {
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn update_app_settings(
        &self,
        _target: &ComputeTarget,
        settings: &BTreeMap<String, String>,
    ) -> Result<(), DeployError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }
}

/// Fails the first `failures` uploads, then succeeds
pub struct FakeTransport {
    pub kind: TransportKind,
    pub failures: u32,
    pub calls: AtomicU32,
    pub uploaded: Mutex<Vec<PathBuf>>,
}

impl FakeTransport {
    pub fn new(kind: TransportKind, failures: u32) -> Self {
        Self {
            kind,
            failures,
            calls: AtomicU32::new(0),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing(kind: TransportKind) -> Self {
        Self::new(kind, u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublishTransport for FakeTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn upload(&self, _target: &ComputeTarget, archive: &File) -> Result<(), DeployError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !archive.exists().await {
            return Err(DeployError::TransportError("archive vanished".to_string()));
        }
        if call <= self.failures {
            return Err(DeployError::TransportError(format!("503 on call {}", call)));
        }
        self.uploaded.lock().unwrap().push(archive.path().to_path_buf());
        Ok(())
    }
}

/// All fakes for one flow run
pub struct Harness {
    pub engine: FakeEngine,
    pub secrets: FakeSecretStore,
    pub releases: FakeReleases,
    pub site: FakeSite,
    pub primary: FakeTransport,
    pub fallback: FakeTransport,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            engine: FakeEngine::succeeding(),
            secrets: FakeSecretStore::default(),
            releases: FakeReleases::with_assets(&["ipam.zip", "ipamfunc.zip"]),
            site: FakeSite::default(),
            primary: FakeTransport::new(TransportKind::Primary, 0),
            fallback: FakeTransport::new(TransportKind::Fallback, 0),
        }
    }

    pub fn services(&self) -> Services<'_> {
        Services {
            engine: &self.engine,
            secrets: &self.secrets,
            releases: &self.releases,
            site: &self.site,
            primary: &self.primary,
            fallback: &self.fallback,
        }
    }
}

/// Run options with no delay between retries
pub fn fast_options(temp_root: &Path) -> RunOptions {
    RunOptions {
        publish: FsmSettings {
            retry_count: 3,
            retry_delay: Duration::ZERO,
        },
        temp_root: temp_root.to_path_buf(),
    }
}

/// Write `document` and a trivial template into `dir`, return the document path
pub fn write_config(dir: &Path, document: serde_json::Value) -> PathBuf {
    let path = dir.join("deploy.json");
    std::fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    std::fs::write(
        dir.join("main.json"),
        r#"{ "$schema": "https://schema.management.azure.com/schemas/2018-05-01/subscriptionDeploymentTemplate.json#", "resources": [] }"#,
    )
    .unwrap();
    path
}

pub fn base_document() -> serde_json::Value {
    serde_json::json!({
        "location": "eastus",
        "engineAppId": "00000000-0000-0000-0000-000000000001",
        "engineSecret": "super-secret",
        "uiAppId": "00000000-0000-0000-0000-000000000002",
        "resourceNames": { "appService": "ipam-app", "keyVault": "ipam-kv" },
        "tags": { "owner": "netops" }
    })
}

pub async fn load(path: &Path, overrides: Overrides) -> EffectiveConfig {
    let document = DeployConfig::load(path).await.unwrap();
    resolve(document, path, overrides).unwrap()
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}
