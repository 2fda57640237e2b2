// ─── Integrity ───
// Content digests for the on-disk cache. The length of the declared hash picks
// the algorithm; a file that fails validation is deleted so the next attempt
// downloads it cleanly.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// Digest algorithms understood by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// 40 hex characters.
    Sha1,
    /// 64 hex characters.
    Sha256,
}

/// Pick the algorithm for a lower-case hex hash by its length.
///
/// Performs no I/O, so callers can reject a bad hash before touching the
/// filesystem or the network.
pub fn select_algorithm(hash: &str) -> LauncherResult<HashAlgorithm> {
    match hash.len() {
        40 => Ok(HashAlgorithm::Sha1),
        64 => Ok(HashAlgorithm::Sha256),
        length => Err(LauncherError::UnsupportedHash {
            hash: hash.to_string(),
            length,
        }),
    }
}

fn digest_reader<R: Read>(mut reader: R, algorithm: HashAlgorithm) -> io::Result<String> {
    match algorithm {
        HashAlgorithm::Sha1 => {
            let mut hasher = Sha1::new();
            io::copy(&mut reader, &mut hasher)?;
            Ok(hex::encode(hasher.finalize()))
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            io::copy(&mut reader, &mut hasher)?;
            Ok(hex::encode(hasher.finalize()))
        }
    }
}

/// Stream `path` through `algorithm` and return the lower-case hex digest.
pub fn digest(path: &Path, algorithm: HashAlgorithm) -> LauncherResult<String> {
    let file = File::open(path).map_err(|e| LauncherError::io(path, e))?;
    digest_reader(BufReader::new(file), algorithm).map_err(|e| LauncherError::io(path, e))
}

/// Digest of an in-memory buffer.
pub fn digest_bytes(bytes: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha1 => hex::encode(Sha1::digest(bytes)),
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
    }
}

/// Check that `path` holds content matching `expected_hash`.
///
/// - Unsupported hash length → `UnsupportedHash`, before any I/O.
/// - Missing file → `Ok(false)`.
/// - Mismatch → the file is deleted and `Ok(false)` is returned; failing to
///   delete it is an error.
/// - Match → `Ok(true)`, nothing touched.
pub fn validate(path: &Path, expected_hash: &str) -> LauncherResult<bool> {
    let algorithm = select_algorithm(expected_hash)?;

    if !path.exists() {
        return Ok(false);
    }

    let actual = digest(path, algorithm)?;
    if actual == expected_hash {
        return Ok(true);
    }

    warn!(
        "Removing corrupted file {:?}: expected {}, got {}",
        path, expected_hash, actual
    );
    std::fs::remove_file(path).map_err(|e| LauncherError::io(path, e))?;
    debug!("Deleted {:?}", path);
    Ok(false)
}

/// [`validate`] on the blocking pool, for use from async code.
pub async fn validate_async(path: &Path, expected_hash: &str) -> LauncherResult<bool> {
    let path = path.to_path_buf();
    let expected = expected_hash.to_string();
    tokio::task::spawn_blocking(move || validate(&path, &expected))
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?
}
