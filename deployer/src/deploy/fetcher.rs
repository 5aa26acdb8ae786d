//! Resolves the engine archive to publish

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use azure_models::models::{Release, ReleaseAsset};
use tracing::{info, warn};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Archive published for the App Service flavour
pub const APP_ARCHIVE_NAME: &str = "ipam.zip";
/// Archive published for the Function App flavour
pub const FUNCTION_ARCHIVE_NAME: &str = "ipamfunc.zip";

const TEMP_DIR_PREFIX: &str = "ipam-artifact";

/// Expected release asset name
pub fn expected_archive_name(function_app: bool) -> &'static str {
    if function_app {
        FUNCTION_ARCHIVE_NAME
    } else {
        APP_ARCHIVE_NAME
    }
}

/// Source-control release listing
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Latest published release of `repo` (`owner/name`)
    async fn latest_release(&self, repo: &str) -> Result<Release, DeployError>;

    /// Download an asset to `destination`
    async fn download(&self, asset: &ReleaseAsset, destination: &File) -> Result<(), DeployError>;
}

/// An archive owned by the run
#[derive(Debug, PartialEq, Eq)]
pub enum ArtifactReference {
    /// Supplied by the caller; never deleted
    Local(PathBuf),

    /// Downloaded into a run-owned temporary directory
    Downloaded { dir: Dir, file: File },
}

impl ArtifactReference {
    pub fn path(&self) -> &Path {
        match self {
            ArtifactReference::Local(path) => path,
            ArtifactReference::Downloaded { file, .. } => file.path(),
        }
    }

    pub fn file(&self) -> File {
        File::new(self.path())
    }

    /// Remove the temporary directory of a downloaded archive
    pub async fn cleanup(self) {
        if let ArtifactReference::Downloaded { dir, .. } = self {
            match dir.delete().await {
                Ok(()) => info!("Removed temporary directory {}", dir.path().display()),
                Err(e) => warn!("Unable to remove {}: {}", dir.path().display(), e),
            }
        }
    }
}

/// Fetches the engine archive
pub struct ArtifactFetcher<'a> {
    source: &'a dyn ReleaseSource,
    temp_root: PathBuf,
}

impl<'a> ArtifactFetcher<'a> {
    pub fn new(source: &'a dyn ReleaseSource) -> Self {
        Self {
            source,
            temp_root: std::env::temp_dir(),
        }
    }

    /// Create temporary directories under `root` instead of the system temp dir
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    /// Use `local` as is, or download the latest `asset_name` from `repo`
    pub async fn fetch(
        &self,
        local: Option<&Path>,
        repo: &str,
        asset_name: &str,
    ) -> Result<ArtifactReference, DeployError> {
        if let Some(path) = local {
            if !File::new(path).exists().await {
                return Err(DeployError::ArtifactFetchError(format!(
                    "Archive not found: {}",
                    path.display()
                )));
            }
            info!("Using local archive {}", path.display());
            return Ok(ArtifactReference::Local(path.to_path_buf()));
        }

        let dir = Dir::create_unique(&self.temp_root, TEMP_DIR_PREFIX)
            .await
            .map_err(|e| DeployError::ArtifactFetchError(format!("Unable to create temp dir: {}", e)))?;

        match self.download_latest(&dir, repo, asset_name).await {
            Ok(file) => Ok(ArtifactReference::Downloaded { dir, file }),
            Err(e) => {
                if let Err(cleanup) = dir.delete().await {
                    warn!("Unable to remove {}: {}", dir.path().display(), cleanup);
                }
                Err(match e {
                    DeployError::ArtifactFetchError(_) => e,
                    other => DeployError::ArtifactFetchError(other.to_string()),
                })
            }
        }
    }

    async fn download_latest(&self, dir: &Dir, repo: &str, asset_name: &str) -> Result<File, DeployError> {
        let release = self.source.latest_release(repo).await?;
        info!("Latest release of {} is {}", repo, release.tag_name);

        let asset = release
            .assets
            .iter()
            .find(|asset| asset.name == asset_name)
            .ok_or_else(|| {
                let available: Vec<&str> = release.assets.iter().map(|a| a.name.as_str()).collect();
                DeployError::ArtifactFetchError(format!(
                    "Release {} of {} has no asset named {} (found: {})",
                    release.tag_name,
                    repo,
                    asset_name,
                    available.join(", ")
                ))
            })?;

        let file = dir.file(asset_name);
        info!("Downloading {} ({} bytes)", asset.browser_download_url, asset.size);
        self.source.download(asset, &file).await?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_archive_name() {
        assert_eq!(expected_archive_name(false), "ipam.zip");
        assert_eq!(expected_archive_name(true), "ipamfunc.zip");
    }
}
