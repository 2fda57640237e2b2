use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::assets::AssetManager;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JdkInstaller;
use crate::core::platform::Platform;
use crate::core::version::FeatureSet;

const APP_DIR_NAME: &str = "Pickaxe";
const SETTINGS_FILE: &str = "launcher_settings.json";

/// User-tunable settings persisted in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherSettings {
    /// Feature toggles consulted by rule ladders.
    pub features: BTreeMap<String, bool>,
    /// Java major version to install instead of the one the version asks for.
    pub java_major: Option<u32>,
    /// Whether `acquire` also installs a Java runtime.
    pub install_java: bool,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        let features = [
            ("is_demo_user", false),
            ("has_custom_resolution", true),
            ("has_quick_plays_support", false),
            ("is_quick_play_singleplayer", false),
            ("is_quick_play_multiplayer", false),
            ("is_quick_play_realms", false),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

        Self {
            features,
            java_major: None,
            install_java: true,
        }
    }
}

impl LauncherSettings {
    /// Read settings from `data_dir`, falling back to defaults.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("No settings at {:?}, using defaults", path);
                return Self::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring malformed settings {:?}: {}", path, e);
            Self::default()
        })
    }

    pub fn save(&self, data_dir: &Path) -> LauncherResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|e| LauncherError::io(data_dir, e))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|source| LauncherError::Json {
            source_name: path.display().to_string(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(path, e))
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.features
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}

/// Everything a command needs: where files live, how to fetch them and the
/// conditions rules are evaluated against.
pub struct AppState {
    pub data_dir: PathBuf,
    pub downloader: Downloader,
    pub settings: LauncherSettings,
    pub platform: Platform,
}

impl AppState {
    pub fn new(data_dir: Option<PathBuf>) -> LauncherResult<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        std::fs::create_dir_all(&data_dir).map_err(|e| LauncherError::io(&data_dir, e))?;

        let settings = LauncherSettings::load(&data_dir);
        Ok(Self {
            data_dir,
            downloader: Downloader::new()?,
            settings,
            platform: Platform::current(),
        })
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.data_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.data_dir.join("assets")
    }

    pub fn runtimes_dir(&self) -> PathBuf {
        self.data_dir.join("runtimes")
    }

    pub fn client_jar_path(&self, version_id: &str) -> PathBuf {
        self.data_dir
            .join("versions")
            .join(version_id)
            .join(format!("{version_id}.jar"))
    }

    pub fn asset_manager(&self) -> AssetManager {
        AssetManager::new(self.assets_dir())
    }

    pub fn jdk_installer(&self) -> JdkInstaller {
        JdkInstaller::new(self.runtimes_dir())
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        self.settings.save(&self.data_dir)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
