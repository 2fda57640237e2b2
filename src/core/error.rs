use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Central error type for the acquisition backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("Failed to download {url}: {source}")]
    Network {
        url: String,
        source: reqwest::Error,
    },

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("Downloaded content of {path:?} from {url} does not match {expected}")]
    CorruptDownload {
        path: PathBuf,
        url: String,
        expected: String,
    },

    #[error("Hash mismatch for {url}: expected {expected}, got {actual}")]
    HashMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Unsupported hash {hash:?}: length {length} is neither 40 nor 64")]
    UnsupportedHash { hash: String, length: usize },

    // ── JSON ────────────────────────────────────────────
    #[error("Failed to parse JSON of {source_name}: {source}")]
    Json {
        source_name: String,
        source: serde_json::Error,
    },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Version not found in manifest: {0}")]
    VersionNotFound(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Failed to extract {archive:?}: {source}")]
    Extract {
        archive: PathBuf,
        source: std::io::Error,
    },

    #[error("Zip extraction error in {archive:?}: {source}")]
    Zip {
        archive: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("Unknown archive format: {0:?}")]
    UnknownArchiveFormat(PathBuf),

    #[error("Don't know how to handle {entry} in {archive:?}")]
    UnsupportedEntry { entry: String, archive: PathBuf },

    #[error("Entry {entry} escapes the destination of {archive:?}")]
    UnsafeEntryPath { entry: String, archive: PathBuf },

    // ── Batch ───────────────────────────────────────────
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a [`LauncherError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Integrity,
    Filesystem,
    Parse,
    UnsupportedFormat,
    Aggregate,
    Other,
}

impl LauncherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LauncherError::Io { .. } | LauncherError::Extract { .. } => ErrorKind::Filesystem,
            LauncherError::Network { .. } | LauncherError::DownloadFailed { .. } => {
                ErrorKind::Network
            }
            LauncherError::CorruptDownload { .. } | LauncherError::HashMismatch { .. } => {
                ErrorKind::Integrity
            }
            LauncherError::Json { .. }
            | LauncherError::InvalidManifest(_)
            | LauncherError::VersionNotFound(_) => ErrorKind::Parse,
            LauncherError::UnsupportedHash { .. }
            | LauncherError::UnknownArchiveFormat(_)
            | LauncherError::UnsupportedEntry { .. }
            | LauncherError::UnsafeEntryPath { .. }
            | LauncherError::Zip { .. } => ErrorKind::UnsupportedFormat,
            LauncherError::Aggregate(_) => ErrorKind::Aggregate,
            LauncherError::Other(_) => ErrorKind::Other,
        }
    }

    /// Shorthand for the common `Io { path, source }` construction.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Every failure of a batch of independent operations.
///
/// An empty aggregate means the batch succeeded.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<LauncherError>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: LauncherError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[LauncherError] {
        &self.errors
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate itself.
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} operation(s) failed", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

impl FromIterator<LauncherError> for AggregateError {
    fn from_iter<I: IntoIterator<Item = LauncherError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}
