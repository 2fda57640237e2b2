// ─── Commands ───
// User-facing operations. Each stage of `acquire` only runs once the one
// before it succeeded; any error aborts the rest.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::core::archive::{self, ArchiveFormat};
use crate::core::downloader::integrity;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::java_binary;
use crate::core::state::AppState;
use crate::core::version::manifest::VERSION_MANIFEST_URL;
use crate::core::version::{VersionJson, VersionManifest};

/// Summary of one version entry for listing.
#[derive(Debug, Clone, Serialize)]
pub struct VersionSummary {
    pub id: String,
    pub version_type: String,
    pub release_time: String,
}

/// Everything a launch stage needs after a successful acquisition.
#[derive(Debug, Clone, Serialize)]
pub struct AcquiredVersion {
    pub id: String,
    pub main_class: String,
    /// Client jar first, then libraries in manifest order.
    pub classpath: Vec<PathBuf>,
    pub asset_index: Option<String>,
    pub java_home: Option<PathBuf>,
    pub jvm_arguments: Vec<String>,
    pub game_arguments: Vec<String>,
}

pub async fn list_versions(
    state: &AppState,
    include_snapshots: bool,
) -> LauncherResult<Vec<VersionSummary>> {
    let manifest = VersionManifest::fetch(&state.downloader).await?;
    Ok(manifest
        .versions
        .into_iter()
        .filter(|v| include_snapshots || v.version_type == "release")
        .map(|v| VersionSummary {
            id: v.id,
            version_type: v.version_type,
            release_time: v.release_time,
        })
        .collect())
}

/// Download everything needed to launch `version_id` (latest release when
/// `None`).
pub async fn acquire(state: &AppState, version_id: Option<&str>) -> LauncherResult<AcquiredVersion> {
    acquire_from(state, VERSION_MANIFEST_URL, version_id).await
}

pub async fn acquire_from(
    state: &AppState,
    manifest_url: &str,
    version_id: Option<&str>,
) -> LauncherResult<AcquiredVersion> {
    let manifest = VersionManifest::fetch_from(&state.downloader, manifest_url).await?;
    let entry = match version_id {
        Some(id) => manifest.find_version(id)?,
        None => manifest.latest_release()?,
    };
    info!("Acquiring version {}", entry.id);

    let version: VersionJson = state.downloader.fetch_json_artifact(entry).await?;
    acquire_version(state, &version).await
}

/// The acquisition stages for an already-parsed version JSON.
pub async fn acquire_version(
    state: &AppState,
    version: &VersionJson,
) -> LauncherResult<AcquiredVersion> {
    let features = state.settings.feature_set();
    let platform = &state.platform;

    // 1. Libraries (rule-filtered, ordered)
    let libraries = version
        .download_libraries(&state.libraries_dir(), &state.downloader, &features, platform)
        .await?;

    // 2. Assets
    if let Some(index) = &version.asset_index {
        state
            .asset_manager()
            .download_assets(index, &state.downloader)
            .await?;
    }

    // 3. Client jar
    let client_jar = state.client_jar_path(&version.id);
    version
        .download_client(&client_jar, &state.downloader)
        .await?;

    // 4. Java runtime
    let java_home = match state.settings.java_major.or(version.required_java_major()) {
        Some(major) if state.settings.install_java => Some(
            state
                .jdk_installer()
                .install(&state.downloader, major)
                .await?,
        ),
        _ => None,
    };

    let mut classpath = Vec::with_capacity(libraries.len() + 1);
    classpath.push(client_jar);
    classpath.extend(libraries);

    Ok(AcquiredVersion {
        id: version.id.clone(),
        main_class: version.main_class.clone(),
        classpath,
        asset_index: version.asset_index.as_ref().map(|i| i.id.clone()),
        java_home,
        jvm_arguments: version.jvm_arguments(&features, platform),
        game_arguments: version.game_arguments(&features, platform),
    })
}

/// Install the newest Java runtime for `major`; returns the `java` binary.
pub async fn install_java(state: &AppState, major: u32) -> LauncherResult<PathBuf> {
    let home = state.jdk_installer().install(&state.downloader, major).await?;
    Ok(java_binary(&home))
}

/// Validate a file against a hash; a mismatching file is removed.
pub fn verify(path: &Path, hash: &str) -> LauncherResult<bool> {
    integrity::validate(path, hash)
}

pub fn extract(archive_path: &Path, dest: &Path, format: Option<ArchiveFormat>) -> LauncherResult<()> {
    let format = format
        .or_else(|| ArchiveFormat::from_path(archive_path))
        .ok_or_else(|| LauncherError::UnknownArchiveFormat(archive_path.to_path_buf()))?;
    archive::extract(dest, archive_path, format)
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

    fn state_in(dir: &Path) -> AppState {
        let mut state = AppState::new(Some(dir.to_path_buf())).unwrap();
        state.settings.install_java = false;
        state
    }

    #[tokio::test]
    async fn acquire_version_builds_classpath_client_first() {
        let mut server = Server::new_async().await;
        let client = b"client jar";
        let lib = b"library jar";
        let _client = server
            .mock("GET", "/client.jar")
            .with_body(client)
            .create_async()
            .await;
        let _lib = server
            .mock("GET", "/lib.jar")
            .with_body(lib)
            .create_async()
            .await;

        let version: VersionJson = serde_json::from_value(serde_json::json!({
            "id": "1.20.4",
            "mainClass": "net.minecraft.client.main.Main",
            "downloads": {"client": {
                "sha1": sha1_of(client), "size": client.len(),
                "url": format!("{}/client.jar", server.url())
            }},
            "libraries": [
                {
                    "name": "g:lib:1",
                    "downloads": {"artifact": {
                        "path": "g/lib/1/lib-1.jar", "sha1": sha1_of(lib), "size": lib.len(),
                        "url": format!("{}/lib.jar", server.url())
                    }}
                },
                {
                    "name": "g:never:1",
                    "downloads": {"artifact": {
                        "path": "g/never.jar", "sha1": "0".repeat(40), "size": 1,
                        "url": format!("{}/never.jar", server.url())
                    }},
                    "rules": [{"action": "allow", "os": {"name": "no-such-os"}}]
                }
            ],
            "arguments": {"game": ["--version", "${version_name}"], "jvm": []},
            "javaVersion": {"component": "java-runtime-gamma", "majorVersion": 17}
        }))
        .unwrap();

        let temp = tempfile::tempdir().unwrap();
        let state = state_in(temp.path());
        let acquired = acquire_version(&state, &version).await.unwrap();

        assert_eq!(
            acquired.classpath,
            vec![
                state.client_jar_path("1.20.4"),
                state.libraries_dir().join("g/lib/1/lib-1.jar"),
            ]
        );
        assert_eq!(acquired.game_arguments, vec!["--version", "${version_name}"]);
        assert_eq!(acquired.java_home, None);
    }

    #[tokio::test]
    async fn library_failure_skips_later_stages() {
        let mut server = Server::new_async().await;
        let _lib = server
            .mock("GET", "/lib.jar")
            .with_status(404)
            .create_async()
            .await;
        let client = server
            .mock("GET", "/client.jar")
            .expect(0)
            .create_async()
            .await;

        let version: VersionJson = serde_json::from_value(serde_json::json!({
            "id": "broken",
            "mainClass": "Main",
            "downloads": {"client": {
                "sha1": "0".repeat(40), "size": 1,
                "url": format!("{}/client.jar", server.url())
            }},
            "libraries": [{
                "name": "g:lib:1",
                "downloads": {"artifact": {
                    "path": "g/lib.jar", "sha1": "1".repeat(40), "size": 1,
                    "url": format!("{}/lib.jar", server.url())
                }}
            }]
        }))
        .unwrap();

        let temp = tempfile::tempdir().unwrap();
        let state = state_in(temp.path());
        let err = acquire_version(&state, &version).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Aggregate);
        client.assert_async().await;
    }

    #[tokio::test]
    async fn acquire_resolves_latest_release_through_manifest() {
        let mut server = Server::new_async().await;
        let client = b"client";
        let version_json = serde_json::json!({
            "id": "1.21",
            "mainClass": "Main",
            "downloads": {"client": {
                "sha1": sha1_of(client), "size": client.len(),
                "url": format!("{}/client.jar", server.url())
            }},
            "minecraftArguments": "--username ${auth_player_name}"
        })
        .to_string();
        let manifest = serde_json::json!({
            "latest": {"release": "1.21", "snapshot": "24w01a"},
            "versions": [
                {"id": "24w01a", "type": "snapshot", "releaseTime": "t", "url": format!("{}/snap.json", server.url())},
                {"id": "1.21", "type": "release", "releaseTime": "t",
                 "url": format!("{}/1.21.json", server.url()),
                 "sha1": sha1_of(version_json.as_bytes())}
            ]
        });

        let _manifest = server
            .mock("GET", "/manifest.json")
            .with_body(manifest.to_string())
            .create_async()
            .await;
        let _version = server
            .mock("GET", "/1.21.json")
            .with_body(version_json)
            .create_async()
            .await;
        let _client = server
            .mock("GET", "/client.jar")
            .with_body(client)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let state = state_in(temp.path());
        let url = format!("{}/manifest.json", server.url());
        let acquired = acquire_from(&state, &url, None).await.unwrap();

        assert_eq!(acquired.id, "1.21");
        assert_eq!(acquired.classpath, vec![state.client_jar_path("1.21")]);
        assert_eq!(
            acquired.game_arguments,
            vec!["--username", "${auth_player_name}"]
        );

        let err = acquire_from(&state, &url, Some("0.0.1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn extract_requires_a_known_format() {
        let temp = tempfile::tempdir().unwrap();
        let err = extract(&temp.path().join("blob.bin"), temp.path(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }
}
