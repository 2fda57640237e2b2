use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::artifact::Downloadable;
use super::integrity::{self, digest_bytes, select_algorithm};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;

/// Hash-validated downloader backed by the on-disk cache.
///
/// Cheap to clone; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> LauncherResult<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to `dest`, optionally validating against `expected_hash`.
    ///
    /// A file already at `dest` whose digest matches is a cache hit and no
    /// request is made. Parent directories are created as needed. The body is
    /// streamed straight to disk; a failed transfer removes the partial file.
    /// If the downloaded content does not match, the file is deleted and
    /// `CorruptDownload` is returned.
    pub async fn fetch(
        &self,
        dest: &Path,
        url: &str,
        expected_hash: Option<&str>,
    ) -> LauncherResult<()> {
        if let Some(expected) = expected_hash {
            if integrity::validate_async(dest, expected).await? {
                debug!("Cache hit: {:?}", dest);
                return Ok(());
            }
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;

        let transfer = self.stream_into(url, dest, &mut file).await;
        // Drop the handle before any removal or re-hash; required on Windows.
        drop(file);

        let written = match transfer {
            Ok(written) => written,
            Err(error) => {
                let _ = tokio::fs::remove_file(dest).await;
                return Err(error);
            }
        };

        if let Some(expected) = expected_hash {
            if !integrity::validate_async(dest, expected).await? {
                return Err(LauncherError::CorruptDownload {
                    path: dest.to_path_buf(),
                    url: url.to_string(),
                    expected: expected.to_string(),
                });
            }
        }

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(())
    }

    /// [`Downloader::fetch`] for a descriptor.
    pub async fn fetch_artifact<D>(&self, dest: &Path, artifact: &D) -> LauncherResult<()>
    where
        D: Downloadable + ?Sized,
    {
        self.fetch(dest, artifact.url(), artifact.hash()).await
    }

    async fn stream_into(
        &self,
        url: &str,
        dest: &Path,
        file: &mut tokio::fs::File,
    ) -> LauncherResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| LauncherError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut stream = response.bytes_stream();
        let mut written = 0_u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| LauncherError::Network {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            written = written.saturating_add(chunk.len() as u64);
        }

        file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
        Ok(written)
    }

    // ── JSON download ───────────────────────────────────

    /// Download `url` into memory, verify it, then deserialize it.
    ///
    /// Nothing is parsed unless the body matches `expected_hash`.
    pub async fn fetch_json<T>(&self, url: &str, expected_hash: Option<&str>) -> LauncherResult<T>
    where
        T: DeserializeOwned,
    {
        let algorithm = expected_hash.map(select_algorithm).transpose()?;

        let network = |source| LauncherError::Network {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(network)?;

        if let (Some(expected), Some(algorithm)) = (expected_hash, algorithm) {
            let actual = digest_bytes(&body, algorithm);
            if actual != expected {
                return Err(LauncherError::HashMismatch {
                    url: url.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        serde_json::from_slice(&body).map_err(|source| LauncherError::Json {
            source_name: url.to_string(),
            source,
        })
    }

    /// [`Downloader::fetch_json`] for a descriptor.
    pub async fn fetch_json_artifact<T, D>(&self, artifact: &D) -> LauncherResult<T>
    where
        T: DeserializeOwned,
        D: Downloadable + ?Sized,
    {
        self.fetch_json(artifact.url(), artifact.hash()).await
    }
}
