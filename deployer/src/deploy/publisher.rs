//! Uploads the engine archive to the compute target

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::deploy::fsm::{FsmSettings, PublishEvent, PublishFsm, PublishState};
use crate::errors::DeployError;
use crate::filesys::file::File;

/// Enables Oryx build on the host during ZIP deployment
pub const REMOTE_BUILD_SETTING: &str = "SCM_DO_BUILD_DURING_DEPLOYMENT";
/// Post-build hook that must not survive from earlier deployments
pub const POST_BUILD_SCRIPT_SETTING: &str = "POST_BUILD_SCRIPT_PATH";

/// The App Service or Function App receiving the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeTarget {
    pub name: String,
    pub resource_group: String,
    pub function_app: bool,
}

/// Which upload path is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Managed deployment API
    Primary,

    /// Direct control-endpoint upload with basic credentials
    Fallback,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Primary => f.write_str("primary"),
            TransportKind::Fallback => f.write_str("fallback"),
        }
    }
}

/// One way of getting an archive onto the target
#[async_trait]
pub trait PublishTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn upload(&self, target: &ComputeTarget, archive: &File) -> Result<(), DeployError>;
}

/// Read/write access to the target's application settings
#[async_trait]
pub trait SiteConfigurator: Send + Sync {
    async fn app_settings(&self, target: &ComputeTarget) -> Result<BTreeMap<String, String>, DeployError>;

    async fn update_app_settings(
        &self,
        target: &ComputeTarget,
        settings: &BTreeMap<String, String>,
    ) -> Result<(), DeployError>;
}

/// Apply the build settings ZIP publishing relies on. Idempotent.
pub fn apply_build_settings(settings: &mut BTreeMap<String, String>) {
    settings.insert(REMOTE_BUILD_SETTING.to_string(), "true".to_string());
    settings.remove(POST_BUILD_SCRIPT_SETTING);
}

/// Outcome of a single transport's retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAttempt {
    pub transport: TransportKind,
    pub attempts: u32,
    pub state: PublishState,
    pub error: Option<String>,
}

impl PublishAttempt {
    pub fn succeeded(&self) -> bool {
        self.state == PublishState::Success
    }
}

/// Drives uploads with a bounded, fixed-delay retry loop per transport
pub struct ArtifactPublisher {
    settings: FsmSettings,
}

impl ArtifactPublisher {
    pub fn new(settings: FsmSettings) -> Self {
        Self { settings }
    }

    /// Turn on remote build and clear any post-build script on the target
    pub async fn configure_target(
        &self,
        configurator: &dyn SiteConfigurator,
        target: &ComputeTarget,
    ) -> Result<(), DeployError> {
        let mut settings = configurator.app_settings(target).await?;
        let before = settings.clone();
        apply_build_settings(&mut settings);

        if settings == before {
            debug!("Build settings on {} already in place", target.name);
            return Ok(());
        }

        info!("Updating build settings on {}", target.name);
        configurator.update_app_settings(target, &settings).await
    }

    /// Try one transport until it succeeds or its retry budget is spent
    pub async fn publish_via(
        &self,
        transport: &dyn PublishTransport,
        target: &ComputeTarget,
        archive: &File,
    ) -> PublishAttempt {
        let kind = transport.kind();
        let mut fsm = PublishFsm::new(self.settings.retry_count);

        while !fsm.is_terminal() {
            if fsm.state() == &PublishState::Retrying {
                warn!(
                    "Retrying {} publish to {} in {:?}",
                    kind, target.name, self.settings.retry_delay
                );
                tokio::time::sleep(self.settings.retry_delay).await;
            }

            if let Err(e) = fsm.process(PublishEvent::Attempt) {
                return attempt_from(kind, &fsm, Some(e));
            }
            info!(
                "Publishing {} to {} via {} transport (attempt {})",
                archive.path().display(),
                target.name,
                kind,
                fsm.attempts()
            );

            let event = match transport.upload(target, archive).await {
                Ok(()) => PublishEvent::Succeeded,
                Err(e) => {
                    warn!("{} publish attempt {} failed: {}", kind, fsm.attempts(), e);
                    PublishEvent::Failed(e.to_string())
                }
            };
            if let Err(e) = fsm.process(event) {
                return attempt_from(kind, &fsm, Some(e));
            }
        }

        attempt_from(kind, &fsm, None)
    }
}

fn attempt_from(kind: TransportKind, fsm: &PublishFsm, fault: Option<String>) -> PublishAttempt {
    let state = if fault.is_some() {
        PublishState::Exhausted
    } else {
        fsm.state().clone()
    };

    PublishAttempt {
        transport: kind,
        attempts: fsm.attempts(),
        state,
        error: fault.or_else(|| fsm.error().map(str::to_string)),
    }
}
