// ─── Java Runtime ───
// Selects the newest Adoptium release for a Java major version, downloads the
// package with its checksum and unpacks it next to the archive.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::core::archive::{self, ArchiveFormat};
use crate::core::downloader::{integrity, Downloadable, Downloader};
use crate::core::error::{LauncherError, LauncherResult};

pub const ADOPTIUM_API_BASE: &str = "https://api.adoptium.net/v3/assets/feature_releases";

#[derive(Debug, Clone, Deserialize)]
pub struct AdoptiumRelease {
    #[serde(default)]
    pub release_name: String,
    #[serde(default)]
    pub vendor: String,
    pub binaries: Vec<AdoptiumBinary>,
    pub version_data: AdoptiumVersion,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdoptiumBinary {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub image_type: String,
    #[serde(default)]
    pub os: String,
    pub package: AdoptiumPackage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdoptiumPackage {
    pub checksum: String,
    pub link: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

impl Downloadable for AdoptiumPackage {
    fn url(&self) -> &str {
        &self.link
    }

    fn hash(&self) -> Option<&str> {
        Some(&self.checksum)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AdoptiumVersion {
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
    #[serde(default)]
    pub security: u32,
    #[serde(default)]
    pub build: u32,
    pub semver: String,
    #[serde(default)]
    pub openjdk_version: String,
}

impl AdoptiumVersion {
    fn compare(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.security, self.build).cmp(&(
            other.major,
            other.minor,
            other.security,
            other.build,
        ))
    }
}

/// Order candidates oldest first by (major, minor, security, build).
pub fn sort_releases(releases: &mut [AdoptiumRelease]) {
    releases.sort_by(|a, b| a.version_data.compare(&b.version_data));
}

mod platform {
    /// Adoptium's name for the current architecture.
    pub fn adoptium_arch() -> String {
        match std::env::consts::ARCH {
            "x86_64" => "x64".to_string(),
            "x86" => "x32".to_string(),
            other => other.to_string(),
        }
    }

    /// Adoptium's name for the current OS.
    pub fn adoptium_os() -> &'static str {
        match std::env::consts::OS {
            "windows" => "windows",
            "macos" => "mac",
            _ => "linux",
        }
    }
}

/// Latest GA JRE builds of `major` for this machine, newest last once sorted.
pub fn release_query_url(api_base: &str, major: u32) -> String {
    format!(
        "{}/{}/ga?architecture={}&heap_size=normal&image_type=jre&jvm_impl=hotspot&os={}&page=0&page_size=10&project=jdk&sort_method=DEFAULT&sort_order=DESC&vendor=eclipse",
        api_base,
        major,
        platform::adoptium_arch(),
        platform::adoptium_os(),
    )
}

/// Installs JDK packages under `<runtimes_dir>/net/java/jdk/<semver>/`.
#[derive(Debug, Clone)]
pub struct JdkInstaller {
    runtimes_dir: PathBuf,
    api_base: String,
    format: ArchiveFormat,
}

impl JdkInstaller {
    pub fn new(runtimes_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtimes_dir: runtimes_dir.into(),
            api_base: ADOPTIUM_API_BASE.to_string(),
            format: ArchiveFormat::for_current_os(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_format(mut self, format: ArchiveFormat) -> Self {
        self.format = format;
        self
    }

    pub fn release_dir(&self, semver: &str) -> PathBuf {
        self.runtimes_dir
            .join("net")
            .join("java")
            .join("jdk")
            .join(semver)
    }

    /// Fetch the candidate list for `major` and install the newest one.
    #[instrument(skip(self, downloader))]
    pub async fn install(&self, downloader: &Downloader, major: u32) -> LauncherResult<PathBuf> {
        let url = release_query_url(&self.api_base, major);
        let releases: Vec<AdoptiumRelease> = downloader.fetch_json(&url, None).await?;
        self.install_latest(downloader, releases).await
    }

    /// Install the newest of `releases`, returning the JDK home directory.
    pub async fn install_latest(
        &self,
        downloader: &Downloader,
        mut releases: Vec<AdoptiumRelease>,
    ) -> LauncherResult<PathBuf> {
        sort_releases(&mut releases);
        let latest = releases
            .pop()
            .ok_or_else(|| LauncherError::InvalidManifest("no Java release available".into()))?;

        if latest.binaries.len() != 1 {
            return Err(LauncherError::InvalidManifest(format!(
                "release {} returned {} binaries, expected exactly one",
                latest.version_data.semver,
                latest.binaries.len()
            )));
        }
        let package = &latest.binaries[0].package;
        let semver = &latest.version_data.semver;
        info!("Selected Java runtime {}", semver);

        let dir = self.release_dir(semver);
        let archive = dir.join(format!("jdk-{}.{}", semver, self.format.extension()));

        if integrity::validate_async(&archive, &package.checksum).await? {
            if let Ok(home) = find_jdk(&dir) {
                debug!("Java runtime {} already installed at {:?}", semver, home);
                return Ok(home);
            }
        }

        downloader.fetch_artifact(&archive, package).await?;
        archive::extract_async(&dir, &archive, self.format).await?;

        let home = find_jdk(&dir)?;
        info!("Installed Java runtime {} at {:?}", semver, home);
        Ok(home)
    }
}

/// The JDK home is the first directory inside a release directory.
pub fn find_jdk(release_dir: &Path) -> LauncherResult<PathBuf> {
    let entries =
        std::fs::read_dir(release_dir).map_err(|e| LauncherError::io(release_dir, e))?;

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();

    dirs.into_iter().next().ok_or_else(|| {
        LauncherError::Other(format!("Failed to find JVM dir in {:?}", release_dir))
    })
}

/// Path of the `java` executable inside a JDK home.
pub fn java_binary(home: &Path) -> PathBuf {
    let exe = if cfg!(target_os = "windows") {
        "java.exe"
    } else {
        "java"
    };
    home.join("bin").join(exe)
}
