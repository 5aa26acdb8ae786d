//! Main deployment flow

use tracing::{error, info, warn};

use crate::app::options::RunOptions;
use crate::app::services::Services;
use crate::config::EffectiveConfig;
use crate::console;
use crate::deploy::fetcher::{expected_archive_name, ArtifactFetcher, ArtifactReference};
use crate::deploy::invoker::{
    DeploymentResult, TemplateInvoker, OUTPUT_APP_SERVICE_NAME, OUTPUT_FUNCTION_APP_NAME,
    OUTPUT_HOST_NAME, OUTPUT_RESOURCE_GROUP,
};
use crate::deploy::publisher::{ArtifactPublisher, ComputeTarget, PublishAttempt};
use crate::deploy::secrets::{SecretOutcome, SecretPublisher};
use crate::errors::DeployError;

/// What a completed run did
#[derive(Debug)]
pub struct RunSummary {
    pub deployment: DeploymentResult,
    pub secret: SecretOutcome,

    /// Per-transport publish outcomes, empty in container mode
    pub publish_attempts: Vec<PublishAttempt>,
}

impl RunSummary {
    pub fn host_name(&self) -> Option<&str> {
        self.deployment.output(OUTPUT_HOST_NAME)
    }
}

/// Run the whole flow: provision, migrate the secret, then publish the
/// archive when packaging is native
pub async fn run(
    config: &EffectiveConfig,
    services: &Services<'_>,
    options: &RunOptions,
) -> Result<RunSummary, DeployError> {
    console::step("Deploying infrastructure");
    let deployment = TemplateInvoker::new(services.engine).invoke(config).await?;
    console::done(&format!("Deployment {} succeeded", deployment.id));

    console::step("Storing engine secret");
    let secret = SecretPublisher::new(services.secrets)
        .publish(config, &deployment)
        .await;
    match &secret {
        SecretOutcome::Stored { vault, scrubbed } => {
            console::done(&format!("Secret stored in {}", vault));
            if *scrubbed {
                console::done("Secret removed from the configuration file");
            }
        }
        SecretOutcome::ManualActionRequired { reason } => {
            console::warn(&format!("Manual action required: {}", reason));
        }
    }

    if !config.is_native() {
        info!("Container packaging, skipping archive publish");
        return Ok(RunSummary {
            deployment,
            secret,
            publish_attempts: Vec::new(),
        });
    }

    let target = compute_target(config, &deployment)?;

    console::step("Fetching engine archive");
    let fetcher = ArtifactFetcher::new(services.releases).with_temp_root(&options.temp_root);
    let artifact = fetcher
        .fetch(
            config.archive_path.as_deref(),
            &config.release_repo,
            expected_archive_name(config.function_app),
        )
        .await?;
    console::done(&format!("Archive ready at {}", artifact.path().display()));

    console::step(&format!("Publishing archive to {}", target.name));
    let result = publish_artifact(services, options, &target, &artifact).await;
    artifact.cleanup().await;

    let publish_attempts = result?;
    console::done(&format!("Archive published to {}", target.name));

    Ok(RunSummary {
        deployment,
        secret,
        publish_attempts,
    })
}

/// Compute resource the archive goes to, from the deployment outputs
pub fn compute_target(
    config: &EffectiveConfig,
    deployment: &DeploymentResult,
) -> Result<ComputeTarget, DeployError> {
    let name_key = if config.function_app {
        OUTPUT_FUNCTION_APP_NAME
    } else {
        OUTPUT_APP_SERVICE_NAME
    };

    let missing = |key: &str| {
        DeployError::DeploymentError(format!("Deployment output '{}' is missing", key))
    };

    Ok(ComputeTarget {
        name: deployment.output(name_key).ok_or_else(|| missing(name_key))?.to_string(),
        resource_group: deployment
            .output(OUTPUT_RESOURCE_GROUP)
            .ok_or_else(|| missing(OUTPUT_RESOURCE_GROUP))?
            .to_string(),
        function_app: config.function_app,
    })
}

/// Primary transport first; the fallback only once the primary is exhausted
async fn publish_artifact(
    services: &Services<'_>,
    options: &RunOptions,
    target: &ComputeTarget,
    artifact: &ArtifactReference,
) -> Result<Vec<PublishAttempt>, DeployError> {
    let archive = artifact.file();
    match archive.sha256().await {
        Ok(digest) => info!("Archive {} sha256 {}", archive.path().display(), digest),
        Err(e) => warn!("Unable to hash {}: {}", archive.path().display(), e),
    }

    let publisher = ArtifactPublisher::new(options.publish.clone());
    publisher
        .configure_target(services.site, target)
        .await
        .map_err(|e| DeployError::PublishError(format!("Unable to configure {}: {}", target.name, e)))?;

    let primary = publisher.publish_via(services.primary, target, &archive).await;
    if primary.succeeded() {
        return Ok(vec![primary]);
    }

    warn!(
        "Primary publish exhausted after {} attempts, switching to fallback transport",
        primary.attempts
    );
    console::warn("Primary publish failed, falling back to direct upload");

    let fallback = publisher.publish_via(services.fallback, target, &archive).await;
    if fallback.succeeded() {
        return Ok(vec![primary, fallback]);
    }

    error!(
        "Fallback publish exhausted after {} attempts",
        fallback.attempts
    );
    Err(DeployError::PublishError(format!(
        "Both transports failed for {} (primary: {}; fallback: {})",
        target.name,
        primary.error.as_deref().unwrap_or("unknown"),
        fallback.error.as_deref().unwrap_or("unknown")
    )))
}
