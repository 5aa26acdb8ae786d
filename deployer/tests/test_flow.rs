//! End-to-end flow tests against in-memory fakes

mod common;

use azure_models::models::ProvisioningState;
use ipam_deployer::app::run::run;
use ipam_deployer::config::Overrides;
use ipam_deployer::deploy::fsm::PublishState;
use ipam_deployer::deploy::publisher::TransportKind;
use ipam_deployer::deploy::secrets::SecretOutcome;
use ipam_deployer::errors::DeployError;
use tokio_test::{assert_err, assert_ok};

use common::*;

fn native() -> Overrides {
    Overrides {
        native: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_container_mode_skips_fetch_and_publish() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let config = load(&write_config(dir.path(), base_document()), Overrides::default()).await;
    let harness = Harness::new();

    let summary = assert_ok!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert!(summary.publish_attempts.is_empty());
    assert_eq!(harness.engine.calls(), 1);
    assert_eq!(harness.releases.lookups(), 0);
    assert_eq!(harness.primary.calls(), 0);
    assert_eq!(harness.fallback.calls(), 0);
    assert_eq!(harness.site.updates(), 0);
    assert_eq!(summary.host_name(), Some("ipam-app.azurewebsites.net"));
}

#[tokio::test]
async fn test_secret_is_stored_and_scrubbed() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), base_document());
    let config = load(&path, Overrides::default()).await;
    let harness = Harness::new();

    let summary = assert_ok!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert_eq!(
        summary.secret,
        SecretOutcome::Stored {
            vault: "ipam-kv".to_string(),
            scrubbed: true
        }
    );
    assert_eq!(
        harness.secrets.writes.lock().unwrap().as_slice(),
        &[(
            "ipam-kv".to_string(),
            "ENGINE-SECRET".to_string(),
            "super-secret".to_string()
        )]
    );

    let contents = std::fs::read_to_string(&path).unwrap();
    let document: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(document.get("engineSecret").is_none());
    assert!(!contents.contains("super-secret"));
    assert_eq!(document["location"], "eastus");
}

#[tokio::test]
async fn test_secret_store_failure_degrades_to_manual() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), base_document());
    let config = load(&path, native()).await;
    let mut harness = Harness::new();
    harness.secrets = FakeSecretStore::failing();

    let summary = assert_ok!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert!(matches!(summary.secret, SecretOutcome::ManualActionRequired { .. }));
    // Flow carried on to publishing
    assert_eq!(harness.primary.calls(), 1);
    // Document untouched
    assert!(std::fs::read_to_string(&path).unwrap().contains("super-secret"));
}

#[tokio::test]
async fn test_unwritable_document_only_skips_scrub() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), base_document());
    let config = load(&path, native()).await;
    // The atomic rewrite goes through deploy.tmp; a directory there blocks it
    std::fs::create_dir(dir.path().join("deploy.tmp")).unwrap();
    let harness = Harness::new();

    let summary = assert_ok!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert_eq!(
        summary.secret,
        SecretOutcome::Stored {
            vault: "ipam-kv".to_string(),
            scrubbed: false
        }
    );
    assert_eq!(harness.secrets.writes.lock().unwrap().len(), 1);
    assert!(std::fs::read_to_string(&path).unwrap().contains("super-secret"));
    assert_eq!(harness.primary.calls(), 1);
    assert_eq!(summary.publish_attempts[0].state, PublishState::Success);
}

#[tokio::test]
async fn test_failed_deployment_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let config = load(&write_config(dir.path(), base_document()), native()).await;
    let mut harness = Harness::new();
    harness.engine = FakeEngine::with_state(ProvisioningState::Failed);

    let err = assert_err!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert!(matches!(err, DeployError::DeploymentError(_)));
    assert!(harness.secrets.writes.lock().unwrap().is_empty());
    assert_eq!(harness.releases.lookups(), 0);
    assert_eq!(harness.primary.calls(), 0);
}

#[tokio::test]
async fn test_native_downloads_expected_asset_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let config = load(&write_config(dir.path(), base_document()), native()).await;
    let harness = Harness::new();

    let summary = assert_ok!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert_eq!(harness.releases.downloads(), vec!["ipam.zip".to_string()]);
    assert_eq!(harness.primary.calls(), 1);
    assert_eq!(harness.fallback.calls(), 0);
    assert_eq!(summary.publish_attempts.len(), 1);
    assert_eq!(summary.publish_attempts[0].transport, TransportKind::Primary);
    assert_eq!(harness.site.updates(), 1);
    assert!(dir_is_empty(temp_root.path()));
}

#[tokio::test]
async fn test_function_app_uses_function_archive() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let mut document = base_document();
    document["functionApp"] = serde_json::json!(true);
    let config = load(&write_config(dir.path(), document), native()).await;
    let mut harness = Harness::new();
    harness
        .engine
        .outputs
        .insert("functionAppName".to_string(), "ipam-func".to_string());

    assert_ok!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert_eq!(harness.releases.downloads(), vec!["ipamfunc.zip".to_string()]);
}

#[tokio::test]
async fn test_asset_name_mismatch_is_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let config = load(&write_config(dir.path(), base_document()), native()).await;
    let mut harness = Harness::new();
    harness.releases = FakeReleases::with_assets(&["ipam-v3.zip", "IPAM.zip"]);

    let err = assert_err!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert!(matches!(err, DeployError::ArtifactFetchError(_)));
    assert!(harness.releases.downloads().is_empty());
    assert_eq!(harness.primary.calls(), 0);
    assert!(dir_is_empty(temp_root.path()));
}

#[tokio::test]
async fn test_both_transports_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let config = load(&write_config(dir.path(), base_document()), native()).await;
    let mut harness = Harness::new();
    harness.primary = FakeTransport::always_failing(TransportKind::Primary);
    harness.fallback = FakeTransport::always_failing(TransportKind::Fallback);

    let err = assert_err!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert!(matches!(err, DeployError::PublishError(_)));
    assert_eq!(harness.primary.calls(), 4);
    assert_eq!(harness.fallback.calls(), 4);
    assert!(dir_is_empty(temp_root.path()));
}

#[tokio::test]
async fn test_fallback_after_primary_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let config = load(&write_config(dir.path(), base_document()), native()).await;
    let mut harness = Harness::new();
    harness.primary = FakeTransport::always_failing(TransportKind::Primary);
    harness.fallback = FakeTransport::new(TransportKind::Fallback, 2);

    let summary = assert_ok!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert_eq!(harness.primary.calls(), 4);
    assert_eq!(harness.fallback.calls(), 3);
    assert_eq!(summary.publish_attempts[0].state, PublishState::Exhausted);
    assert_eq!(summary.publish_attempts[1].state, PublishState::Success);
    assert_eq!(summary.publish_attempts[1].attempts, 3);
}

#[tokio::test]
async fn test_local_archive_is_used_and_kept() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let archive = dir.path().join("ipam.zip");
    std::fs::write(&archive, b"local zip").unwrap();

    let overrides = Overrides {
        native: true,
        archive_path: Some(archive.clone()),
        ..Default::default()
    };
    let config = load(&write_config(dir.path(), base_document()), overrides).await;
    let harness = Harness::new();

    assert_ok!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert_eq!(harness.releases.lookups(), 0);
    assert_eq!(harness.primary.uploaded.lock().unwrap().as_slice(), &[archive.clone()]);
    assert!(archive.exists());
}

#[tokio::test]
async fn test_missing_compute_output_is_deployment_error() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let config = load(&write_config(dir.path(), base_document()), native()).await;
    let mut harness = Harness::new();
    harness.engine.outputs.remove("resourceGroupName");

    let err = assert_err!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    assert!(matches!(err, DeployError::DeploymentError(_)));
    assert_eq!(harness.releases.lookups(), 0);
}

#[tokio::test]
async fn test_parameters_sent_to_engine() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = tempfile::tempdir().unwrap();
    let overrides = Overrides {
        disable_ui: true,
        location: Some("westus3".to_string()),
        ..Default::default()
    };
    let config = load(&write_config(dir.path(), base_document()), overrides).await;
    let harness = Harness::new();

    assert_ok!(run(&config, &harness.services(), &fast_options(temp_root.path())).await);

    let (name, request) = harness.engine.last_request.lock().unwrap().clone().unwrap();
    assert!(name.starts_with("ipamInfraDeploy-"));
    assert_eq!(request.location, "westus3");

    let parameters = &request.properties.parameters;
    assert_eq!(parameters["location"].value, "westus3");
    assert_eq!(parameters["uiAppId"].value, "");
    assert_eq!(parameters["engineAppSecret"].value, "super-secret");
    assert_eq!(parameters["deployAsContainer"].value, true);
    assert_eq!(parameters["resourceNames"].value["keyVault"], "ipam-kv");
    assert_eq!(parameters["tags"].value["owner"], "netops");
}
