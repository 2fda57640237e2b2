// ─── Batch Downloads ───
// Deduplicates a batch of download tasks and fetches every distinct one in
// parallel. Failures never cut the batch short: every launched transfer runs
// to completion and all errors are reported together.

use std::collections::HashSet;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::client::Downloader;
use crate::core::error::{AggregateError, LauncherError};

/// A single file to download, tagged with its position in the caller's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub dest: PathBuf,
    pub url: String,
    pub hash: Option<String>,
    pub origin_index: usize,
}

impl DownloadTask {
    pub fn new(
        dest: impl Into<PathBuf>,
        url: impl Into<String>,
        hash: Option<String>,
        origin_index: usize,
    ) -> Self {
        Self {
            dest: dest.into(),
            url: url.into(),
            hash,
            origin_index,
        }
    }

    /// Tasks with equal keys describe the same physical download.
    pub fn dedup_key(&self) -> DedupKey {
        match &self.hash {
            Some(hash) => DedupKey::Hash(hash.clone()),
            None => DedupKey::Path(self.dest.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Hash(String),
    Path(PathBuf),
}

/// Keep the first task (lowest `origin_index`) of every dedup class.
///
/// The result is ordered by `origin_index`.
pub fn dedup_tasks(mut tasks: Vec<DownloadTask>) -> Vec<DownloadTask> {
    tasks.sort_by_key(|task| task.origin_index);

    let mut seen = HashSet::new();
    tasks.retain(|task| seen.insert(task.dedup_key()));
    tasks
}

impl Downloader {
    /// Download every distinct task concurrently.
    ///
    /// Duplicates are collapsed before anything starts, then one task per
    /// dedup class is spawned with no concurrency cap. Returns the
    /// destinations of the fetched representatives in input order, or every
    /// failure folded into one [`AggregateError`].
    pub async fn download_many(
        &self,
        tasks: Vec<DownloadTask>,
    ) -> Result<Vec<PathBuf>, AggregateError> {
        let submitted = tasks.len();
        let unique = dedup_tasks(tasks);
        let expected = unique.len();

        info!(
            "Starting batch download: {} files ({} duplicates skipped)",
            expected,
            submitted - expected
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        for task in &unique {
            let tx = tx.clone();
            let downloader = self.clone();
            let task = task.clone();
            tokio::spawn(async move {
                let result = downloader
                    .fetch(&task.dest, &task.url, task.hash.as_deref())
                    .await;
                let _ = tx.send((task.origin_index, result));
            });
        }
        drop(tx);

        let mut errors = AggregateError::new();
        let mut received = 0;
        while received < expected {
            let Some((origin_index, result)) = rx.recv().await else {
                break;
            };
            received += 1;
            if let Err(error) = result {
                debug!("Download #{} failed: {}", origin_index, error);
                errors.push(error);
            }
        }

        if received < expected {
            errors.push(LauncherError::Other(format!(
                "{} download task(s) stopped without reporting a result",
                expected - received
            )));
        }

        if !errors.is_empty() {
            warn!("{} of {} downloads failed", errors.len(), expected);
        }
        errors.into_result()?;

        info!("Batch download finished: {} files", expected);
        Ok(unique.into_iter().map(|task| task.dest).collect())
    }
}
