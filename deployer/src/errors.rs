//! Error types for the IPAM deployer

use thiserror::Error;

/// Main error type for the IPAM deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Pre-flight configuration problem (missing file, identity or secret, bad cloud)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Template submission failed or finished in a non-success state
    #[error("Deployment error: {0}")]
    DeploymentError(String),

    /// Secret store write failed. Never fatal to the flow.
    #[error("Secret store error: {0}")]
    SecretStoreError(String),

    #[error("Artifact fetch error: {0}")]
    ArtifactFetchError(String),

    /// Both publish transports exhausted their retries
    #[error("Publish error: {0}")]
    PublishError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Configuration errors are reported before any external call is made
    pub fn is_config(&self) -> bool {
        matches!(self, DeployError::ConfigError(_))
    }
}
