use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::{Downloadable, DownloadTask, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::version_file::AssetIndexInfo;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
    #[serde(skip)]
    url: String,
}

impl AssetObject {
    /// Two-character fan-out directory of the object store.
    ///
    /// The hash becomes a path component, so anything but hex is rejected.
    pub fn prefix(&self) -> LauncherResult<&str> {
        let is_hex = self.hash.bytes().all(|b| b.is_ascii_hexdigit());
        match self.hash.get(..2) {
            Some(prefix) if is_hex => Ok(prefix),
            _ => Err(LauncherError::UnsupportedHash {
                hash: self.hash.clone(),
                length: self.hash.len(),
            }),
        }
    }

    /// Location under `objects/`: `<hh>/<hash>`.
    pub fn relative_path(&self) -> LauncherResult<PathBuf> {
        Ok(Path::new(self.prefix()?).join(&self.hash))
    }

    fn with_base_url(mut self, base_url: &str) -> LauncherResult<Self> {
        self.url = format!("{}/{}/{}", base_url, self.prefix()?, self.hash);
        Ok(self)
    }
}

impl Downloadable for AssetObject {
    fn url(&self) -> &str {
        &self.url
    }

    fn hash(&self) -> Option<&str> {
        Some(&self.hash)
    }
}

/// Manages Minecraft asset downloads (sounds, textures referenced by asset index).
#[derive(Debug, Clone)]
pub struct AssetManager {
    assets_dir: PathBuf,
    resources_url: String,
}

impl AssetManager {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            resources_url: RESOURCES_URL.to_string(),
        }
    }

    pub fn with_resources_url(mut self, url: impl Into<String>) -> Self {
        self.resources_url = url.into();
        self
    }

    pub fn index_path(&self, index_id: &str) -> PathBuf {
        self.assets_dir
            .join("indexes")
            .join(format!("{index_id}.json"))
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.assets_dir.join("objects")
    }

    /// Download the asset index JSON and all referenced assets.
    pub async fn download_assets(
        &self,
        index_info: &AssetIndexInfo,
        downloader: &Downloader,
    ) -> LauncherResult<()> {
        // 1. Asset index, cached like any other hashed file
        let index_path = self.index_path(&index_info.id);
        downloader.fetch_artifact(&index_path, index_info).await?;
        let index = read_index(&index_path).await?;

        // 2. One task per object; shared hashes collapse in the batch
        let tasks = self.object_tasks(&index)?;
        info!(
            "Downloading asset index {} ({} objects)",
            index_info.id,
            tasks.len()
        );

        // 3. Download batch
        downloader.download_many(tasks).await?;
        Ok(())
    }

    fn object_tasks(&self, index: &AssetIndex) -> LauncherResult<Vec<DownloadTask>> {
        let objects_dir = self.objects_dir();

        // Sorted by name so origin indices are stable across runs.
        let mut names: Vec<&String> = index.objects.keys().collect();
        names.sort();

        names
            .into_iter()
            .enumerate()
            .map(|(origin_index, name)| {
                let object = index.objects[name]
                    .clone()
                    .with_base_url(&self.resources_url)?;
                Ok(DownloadTask::new(
                    objects_dir.join(object.relative_path()?),
                    object.url(),
                    object.hash().map(str::to_string),
                    origin_index,
                ))
            })
            .collect()
    }
}

async fn read_index(path: &Path) -> LauncherResult<AssetIndex> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    serde_json::from_slice(&raw).map_err(|source| LauncherError::Json {
        source_name: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::integrity::{digest_bytes, HashAlgorithm};
    use crate::core::error::ErrorKind;
    use mockito::Server;

    fn sha1_of(bytes: &[u8]) -> String {
        digest_bytes(bytes, HashAlgorithm::Sha1)
    }

    #[test]
    fn object_path_uses_hash_prefix() {
        let object = AssetObject {
            hash: "bdf48ef6b5d0d23bbb02e17d04865216179f510a".into(),
            size: 1,
            url: String::new(),
        }
        .with_base_url(RESOURCES_URL)
        .unwrap();

        assert_eq!(
            object.relative_path().unwrap(),
            Path::new("bd").join("bdf48ef6b5d0d23bbb02e17d04865216179f510a")
        );
        assert_eq!(
            object.url(),
            "https://resources.download.minecraft.net/bd/bdf48ef6b5d0d23bbb02e17d04865216179f510a"
        );
    }

    #[test]
    fn non_hex_hash_cannot_leave_objects_dir() {
        for hash in ["../../../../etc/passwd", "ab/cd", "zz00112233445566778899aabbccddeeff001122"] {
            let object = AssetObject {
                hash: hash.into(),
                size: 1,
                url: String::new(),
            };
            assert_eq!(
                object.relative_path().unwrap_err().kind(),
                ErrorKind::UnsupportedFormat
            );
            assert!(object.with_base_url(RESOURCES_URL).is_err());
        }
    }

    #[test]
    fn short_hash_is_rejected() {
        let object = AssetObject {
            hash: "a".into(),
            size: 1,
            url: String::new(),
        };
        assert_eq!(
            object.relative_path().unwrap_err().kind(),
            ErrorKind::UnsupportedFormat
        );
    }

    #[tokio::test]
    async fn downloads_index_and_unique_objects() {
        let mut server = Server::new_async().await;
        let sound = b"sound bytes";
        let texture = b"texture bytes";
        let sound_hash = sha1_of(sound);
        let texture_hash = sha1_of(texture);

        let index_body = serde_json::json!({
            "objects": {
                "minecraft/sounds/a.ogg": {"hash": sound_hash, "size": sound.len()},
                "minecraft/sounds/a_copy.ogg": {"hash": sound_hash, "size": sound.len()},
                "minecraft/textures/b.png": {"hash": texture_hash, "size": texture.len()}
            }
        })
        .to_string();

        let index_mock = server
            .mock("GET", "/indexes/17.json")
            .with_body(index_body.clone())
            .expect(1)
            .create_async()
            .await;
        let sound_mock = server
            .mock("GET", format!("/{}/{}", &sound_hash[..2], sound_hash).as_str())
            .with_body(sound)
            .expect(1)
            .create_async()
            .await;
        let texture_mock = server
            .mock("GET", format!("/{}/{}", &texture_hash[..2], texture_hash).as_str())
            .with_body(texture)
            .expect(1)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let manager = AssetManager::new(temp.path()).with_resources_url(server.url());
        let info = AssetIndexInfo {
            id: "17".into(),
            url: format!("{}/indexes/17.json", server.url()),
            sha1: Some(sha1_of(index_body.as_bytes())),
            total_size: None,
        };

        let downloader = Downloader::new().unwrap();
        manager.download_assets(&info, &downloader).await.unwrap();

        assert!(manager.index_path("17").exists());
        let stored = manager
            .objects_dir()
            .join(&sound_hash[..2])
            .join(&sound_hash);
        assert_eq!(std::fs::read(stored).unwrap(), sound);
        index_mock.assert_async().await;
        sound_mock.assert_async().await;
        texture_mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_objects_surface_as_aggregate() {
        let mut server = Server::new_async().await;
        let hash = sha1_of(b"missing");
        let index_body = serde_json::json!({
            "objects": {"icons/icon.png": {"hash": hash, "size": 7}}
        })
        .to_string();
        let _index = server
            .mock("GET", "/index.json")
            .with_body(index_body)
            .create_async()
            .await;
        let _object = server
            .mock("GET", format!("/{}/{}", &hash[..2], hash).as_str())
            .with_status(404)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let manager = AssetManager::new(temp.path()).with_resources_url(server.url());
        let info = AssetIndexInfo {
            id: "legacy".into(),
            url: format!("{}/index.json", server.url()),
            sha1: None,
            total_size: None,
        };

        let downloader = Downloader::new().unwrap();
        let err = manager.download_assets(&info, &downloader).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Aggregate);
    }
}
