//! Update lifecycle — check GitHub Releases, stage a download, apply it.
//!
//! Every step is fail-soft: the host logs update problems and keeps running.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("update network error: {0}")]
    Network(String),

    #[error("release has no downloadable asset")]
    NoAsset,

    #[error("no update staged")]
    NothingStaged,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A GitHub release entry.
#[derive(Debug, Deserialize)]
pub struct GithubRelease {
    /// The tag name, e.g. "v0.2.0".
    pub tag_name: String,
    /// URL to the release page.
    pub html_url: String,
    /// Release notes body (markdown).
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// Outcome of a launch-time update check.
#[derive(Debug)]
pub struct UpdateInfo {
    /// A newer release exists upstream.
    pub update_available: bool,
    /// A downloaded release is staged and can be applied.
    pub update_ready: bool,
    pub release: Option<GithubRelease>,
}

/// Checks for, stages, and applies updates from GitHub Releases.
pub struct Updater {
    api_url: String,
    current_version: String,
    staging_path: PathBuf,
}

impl Updater {
    /// Create an updater for the given GitHub `owner/repo`.
    pub fn new(repo: &str) -> Self {
        let staging_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("atrium");
        Self {
            api_url: format!("https://api.github.com/repos/{repo}/releases/latest"),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            staging_path: staging_dir.join("update-staged"),
        }
    }

    /// Check whether a newer version is available and whether a previously
    /// staged download is ready to apply.
    ///
    /// Network and parsing errors are logged and reported as "no update".
    pub async fn check_for_update(&self) -> UpdateInfo {
        let update_ready = self.staging_path.exists();
        let release = match self.fetch_latest().await {
            Ok(release) => release,
            Err(e) => {
                warn!(error = %e, "update check failed");
                return UpdateInfo {
                    update_available: false,
                    update_ready,
                    release: None,
                };
            }
        };

        let latest = release.tag_name.trim_start_matches('v');
        let update_available = is_newer(latest, &self.current_version);
        if update_available {
            info!(latest = %release.tag_name, current = %self.current_version, "update available");
        }
        UpdateInfo {
            update_available,
            update_ready,
            release: Some(release),
        }
    }

    /// Download the first asset of `release` into the staging path.
    pub async fn download_update(&self, release: &GithubRelease) -> Result<PathBuf, UpdateError> {
        let asset = release.assets.first().ok_or(UpdateError::NoAsset)?;
        info!(asset = %asset.name, "downloading update");

        let response = self
            .client()?
            .get(&asset.browser_download_url)
            .send()
            .await
            .map_err(|e| UpdateError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| UpdateError::Network(e.to_string()))?;

        if let Some(parent) = self.staging_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = self.staging_path.with_extension("partial");
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UpdateError::Network(e.to_string()))?;
            tokio::io::AsyncWriteExt::write_all(&mut file, &chunk).await?;
        }
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        drop(file);

        // The staged file only appears once it is complete.
        tokio::fs::rename(&partial, &self.staging_path).await?;
        info!(path = %self.staging_path.display(), "update staged");
        Ok(self.staging_path.clone())
    }

    /// Promote the staged download next to the running executable. The swap
    /// to the new binary happens on the next launch.
    pub fn apply_update(&self) -> Result<PathBuf, UpdateError> {
        if !self.staging_path.exists() {
            return Err(UpdateError::NothingStaged);
        }
        let exe = std::env::current_exe()?;
        let pending = exe.with_extension("update");
        std::fs::copy(&self.staging_path, &pending)?;
        std::fs::remove_file(&self.staging_path)?;
        info!(path = %pending.display(), "update applied, effective on next launch");
        Ok(pending)
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    fn client(&self) -> Result<reqwest::Client, UpdateError> {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("atrium-updater")
            .build()
            .map_err(|e| UpdateError::Network(e.to_string()))
    }

    async fn fetch_latest(&self) -> Result<GithubRelease, UpdateError> {
        let response = self
            .client()?
            .get(&self.api_url)
            .send()
            .await
            .map_err(|e| UpdateError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(UpdateError::Network(format!(
                "release feed returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| UpdateError::Network(e.to_string()))
    }
}

/// Simple semver comparison: returns true if `a` > `b`.
fn is_newer(a: &str, b: &str) -> bool {
    let parse =
        |v: &str| -> Vec<u64> { v.split('.').filter_map(|s| s.parse::<u64>().ok()).collect() };

    let va = parse(a);
    let vb = parse(b);

    for i in 0..va.len().max(vb.len()) {
        let a_part = va.get(i).copied().unwrap_or(0);
        let b_part = vb.get(i).copied().unwrap_or(0);
        if a_part > b_part {
            return true;
        }
        if a_part < b_part {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_comparison() {
        assert!(is_newer("0.2.0", "0.1.0"));
        assert!(is_newer("1.0.0", "0.9.9"));
        assert!(is_newer("1.0.1", "1.0.0"));
        assert!(!is_newer("0.1.0", "0.2.0"));
        assert!(!is_newer("1.0.0", "1.0.0"));
    }

    #[test]
    fn version_comparison_different_lengths() {
        assert!(is_newer("1.0.0", "0.9"));
        assert!(!is_newer("0.9", "1.0.0"));
        assert!(is_newer("1.1", "1.0.0"));
    }

    #[test]
    fn updater_creation() {
        let updater = Updater::new("dylan/atrium");
        assert!(!updater.current_version().is_empty());
        assert!(updater.staging_path().ends_with("update-staged"));
    }

    #[test]
    fn release_parsing() {
        let release: GithubRelease = serde_json::from_str(
            r#"{
                "tag_name": "v0.2.0",
                "html_url": "https://github.com/dylan/atrium/releases/v0.2.0",
                "body": "fixes",
                "assets": [
                    {"name": "atrium-x86_64", "browser_download_url": "https://example.org/a"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(release.tag_name, "v0.2.0");
        assert_eq!(release.assets.len(), 1);
    }
}
