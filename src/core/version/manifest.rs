// ─── Version Manifest ───
// Handles fetching and parsing the Mojang version manifest v2.

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::{Downloadable, Downloader};
use crate::core::error::{LauncherError, LauncherResult};

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level Mojang version manifest.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "releaseTime")]
    pub release_time: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl Downloadable for VersionEntry {
    fn url(&self) -> &str {
        &self.url
    }

    fn hash(&self) -> Option<&str> {
        self.sha1.as_deref()
    }
}

impl VersionManifest {
    /// Fetch the version manifest from Mojang.
    pub async fn fetch(downloader: &Downloader) -> LauncherResult<Self> {
        Self::fetch_from(downloader, VERSION_MANIFEST_URL).await
    }

    pub async fn fetch_from(downloader: &Downloader, url: &str) -> LauncherResult<Self> {
        info!("Fetching Minecraft version manifest...");
        let manifest: VersionManifest = downloader.fetch_json(url, None).await?;
        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> LauncherResult<&VersionEntry> {
        self.versions
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| LauncherError::VersionNotFound(id.to_string()))
    }

    pub fn latest_release(&self) -> LauncherResult<&VersionEntry> {
        self.find_version(&self.latest.release)
    }

    /// List all official stable versions (release only).
    pub fn releases(&self) -> Vec<&VersionEntry> {
        self.versions
            .iter()
            .filter(|v| v.version_type == "release")
            .collect()
    }
}
