// ─── Version File ───
// Parses a Mojang version JSON, decodes conditional arguments and schedules
// the library downloads that pass their rule ladders.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use super::rules::{is_allowed, FeatureSet, Rule};
use crate::core::downloader::{Downloadable, DownloadTask, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Platform;

/// A fully parsed Mojang version JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
    pub main_class: String,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    #[serde(default)]
    pub component: Option<String>,
    pub major_version: u32,
}

#[derive(Debug, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
    #[serde(default)]
    pub server: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

impl Downloadable for DownloadArtifact {
    fn url(&self) -> &str {
        &self.url
    }

    fn hash(&self) -> Option<&str> {
        Some(&self.sha1)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

impl Downloadable for AssetIndexInfo {
    fn url(&self) -> &str {
        &self.url
    }

    fn hash(&self) -> Option<&str> {
        self.sha1.as_deref()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

// ─── Conditional Arguments ───

/// One entry of `arguments.game` / `arguments.jvm`.
///
/// Manifests use either a bare string or an object carrying a `value`
/// (string or list) guarded by `rules`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Literal(String),
    Conditional { rules: Vec<Rule>, values: Vec<String> },
}

impl Argument {
    /// Decode from raw JSON, discriminating on the value's shape.
    pub fn from_value(raw: Value) -> LauncherResult<Self> {
        match raw {
            Value::String(literal) => Ok(Argument::Literal(literal)),
            Value::Object(mut object) => {
                let rules = match object.remove("rules") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(rules) => serde_json::from_value(rules).map_err(|source| {
                        LauncherError::Json {
                            source_name: "argument rules".to_string(),
                            source,
                        }
                    })?,
                };

                let values = match object.remove("value") {
                    Some(Value::String(value)) => vec![value],
                    Some(Value::Array(items)) => items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(value) => Ok(value),
                            other => Err(LauncherError::InvalidManifest(format!(
                                "argument value is not a string: {other}"
                            ))),
                        })
                        .collect::<LauncherResult<Vec<_>>>()?,
                    Some(other) => {
                        return Err(LauncherError::InvalidManifest(format!(
                            "unsupported argument value: {other}"
                        )))
                    }
                    None => {
                        return Err(LauncherError::InvalidManifest(
                            "conditional argument has no value".to_string(),
                        ))
                    }
                };

                Ok(Argument::Conditional { rules, values })
            }
            other => Err(LauncherError::InvalidManifest(format!(
                "can't handle argument JSON: {other}"
            ))),
        }
    }

    /// The values this argument contributes under the given conditions.
    pub fn resolve(&self, features: &FeatureSet, platform: &Platform) -> &[String] {
        match self {
            Argument::Literal(value) => std::slice::from_ref(value),
            Argument::Conditional { rules, values } => {
                if is_allowed(rules, features, platform) {
                    values.as_slice()
                } else {
                    &[]
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for Argument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Argument::from_value(raw).map_err(serde::de::Error::custom)
    }
}

// ─── Library Entry with Rules ───

#[derive(Debug, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<LibDownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    pub path: String,
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

impl Downloadable for LibDownloadArtifact {
    fn url(&self) -> &str {
        &self.url
    }

    fn hash(&self) -> Option<&str> {
        Some(&self.sha1)
    }
}

impl LibraryEntry {
    pub fn is_allowed(&self, features: &FeatureSet, platform: &Platform) -> bool {
        is_allowed(&self.rules, features, platform)
    }

    pub fn artifact(&self) -> Option<&LibDownloadArtifact> {
        self.downloads.as_ref()?.artifact.as_ref()
    }
}

/// Build download tasks for every library allowed on this platform.
///
/// `origin_index` is the library's position in the manifest.
pub fn library_tasks(
    libraries: &[LibraryEntry],
    libs_dir: &Path,
    features: &FeatureSet,
    platform: &Platform,
) -> Vec<DownloadTask> {
    let mut tasks = Vec::new();

    for (index, lib) in libraries.iter().enumerate() {
        if !lib.is_allowed(features, platform) {
            debug!("Skipping library (rules): {}", lib.name);
            continue;
        }

        let Some(artifact) = lib.artifact() else {
            debug!("Library has no artifact download: {}", lib.name);
            continue;
        };

        tasks.push(DownloadTask::new(
            libs_dir.join(&artifact.path),
            artifact.url(),
            artifact.hash().map(str::to_string),
            index,
        ));
    }

    tasks
}

impl VersionJson {
    /// Download all allowed libraries and return the classpath entries in
    /// manifest order.
    pub async fn download_libraries(
        &self,
        libs_dir: &Path,
        downloader: &Downloader,
        features: &FeatureSet,
        platform: &Platform,
    ) -> LauncherResult<Vec<PathBuf>> {
        let tasks = library_tasks(&self.libraries, libs_dir, features, platform);
        let allowed = tasks.len();
        let classpath = downloader.download_many(tasks).await?;

        info!(
            "Processed {} libraries ({} allowed, {} on classpath)",
            self.libraries.len(),
            allowed,
            classpath.len()
        );
        Ok(classpath)
    }

    /// Download the client jar to `dest`.
    pub async fn download_client(&self, dest: &Path, downloader: &Downloader) -> LauncherResult<()> {
        let client = self
            .downloads
            .as_ref()
            .and_then(|downloads| downloads.client.as_ref())
            .ok_or_else(|| {
                LauncherError::InvalidManifest(format!("version {} has no client download", self.id))
            })?;

        downloader.fetch_artifact(dest, client).await?;
        info!("Downloaded client jar for {}", self.id);
        Ok(())
    }

    /// Java major version the game expects, if declared.
    pub fn required_java_major(&self) -> Option<u32> {
        self.java_version.as_ref().map(|j| j.major_version)
    }

    /// Rule-filtered game argument templates, placeholders left intact.
    pub fn game_arguments(&self, features: &FeatureSet, platform: &Platform) -> Vec<String> {
        match &self.arguments {
            Some(args) => resolve_all(&args.game, features, platform),
            None => match &self.minecraft_arguments {
                Some(legacy) => legacy.split_whitespace().map(str::to_string).collect(),
                None => Vec::new(),
            },
        }
    }

    /// Rule-filtered JVM argument templates, placeholders left intact.
    pub fn jvm_arguments(&self, features: &FeatureSet, platform: &Platform) -> Vec<String> {
        match &self.arguments {
            Some(args) => resolve_all(&args.jvm, features, platform),
            None => Vec::new(),
        }
    }
}

fn resolve_all(arguments: &[Argument], features: &FeatureSet, platform: &Platform) -> Vec<String> {
    arguments
        .iter()
        .flat_map(|arg| arg.resolve(features, platform))
        .cloned()
        .collect()
}
