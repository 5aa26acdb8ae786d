//! Access tokens for Azure data and control plane calls

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::DeployError;

/// Tokens closer than this to expiry are fetched again
pub const REFRESH_MARGIN: Duration = Duration::minutes(5);

const TOKEN_QUERY: &str = "{accessToken: accessToken, expiresOn: expires_on}";

/// Source of bearer tokens for a given audience
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, audience: &str) -> Result<SecretString, DeployError>;
}

/// `az account get-access-token` output, `expiresOn` in POSIX seconds
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    expires_on: Option<i64>,
}

struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > REFRESH_MARGIN
    }
}

/// Tokens from the operator's Azure CLI login
///
/// Tokens are reused per audience until they come within [`REFRESH_MARGIN`]
/// of expiry. A token without a reported expiry is never reused.
pub struct AzureCliCredential {
    program: PathBuf,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::with_program("az")
    }
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another Azure CLI executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Subscription id of the active Azure CLI context
    pub async fn current_subscription(&self) -> Result<String, DeployError> {
        let id = self
            .run_az(&["account", "show", "--query", "id", "--output", "tsv"])
            .await?;
        if id.is_empty() {
            return Err(DeployError::CredentialError(
                "No active subscription in the Azure CLI context, run 'az login'".to_string(),
            ));
        }
        Ok(id)
    }

    async fn run_az(&self, args: &[&str]) -> Result<String, DeployError> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| DeployError::CredentialError(format!("Failed to run the Azure CLI: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::CredentialError(format!(
                "az {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl TokenProvider for AzureCliCredential {
    async fn token(&self, audience: &str) -> Result<SecretString, DeployError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(audience) {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.token.clone());
            }
            debug!("Access token for {} is about to expire, refreshing", audience);
        }

        debug!("Requesting Azure CLI access token for {}", audience);
        let raw = self
            .run_az(&[
                "account",
                "get-access-token",
                "--resource",
                audience,
                "--query",
                TOKEN_QUERY,
                "--output",
                "json",
            ])
            .await?;
        let parsed: CliToken = serde_json::from_str(&raw).map_err(|e| {
            DeployError::CredentialError(format!("Unexpected Azure CLI token output: {}", e))
        })?;

        let expires_at = parsed
            .expires_on
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        match expires_at {
            Some(expires_at) => {
                cache.insert(
                    audience.to_string(),
                    CachedToken {
                        token: parsed.access_token.clone().into(),
                        expires_at,
                    },
                );
            }
            None => {
                cache.remove(audience);
            }
        }

        Ok(parsed.access_token.into())
    }
}
