// ─── Platform ───
// OS/arch identifiers in manifest vocabulary, plus the few filesystem
// operations whose behaviour differs per OS.

use std::fs::File;
use std::io;
use std::path::Path;

/// The platform descriptor consulted by rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os_name: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os_name: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os_name: os_name.into(),
            arch: arch.into(),
        }
    }

    /// Descriptor of the machine we are running on.
    pub fn current() -> Self {
        Self::new(current_os_name(), current_arch())
    }
}

/// Get the Mojang OS name for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

/// Get the Mojang architecture name for the current platform.
pub fn current_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "x86",
        "x86_64" => "x86_64",
        "aarch64" => "arm64",
        other => other,
    }
}

pub fn create_parents(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Create (or truncate) `path` for writing with the given permission bits.
///
/// On Unix the bits are applied exactly, independent of the process umask,
/// once the caller is done writing; see [`apply_mode`].
#[cfg(unix)]
pub fn create_file_with_mode(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode & 0o7777)
        .open(path)
}

#[cfg(not(unix))]
pub fn create_file_with_mode(path: &Path, _mode: u32) -> io::Result<File> {
    File::create(path)
}

#[cfg(unix)]
pub fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
pub fn apply_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Create a symbolic link at `link` pointing at `target`.
#[cfg(unix)]
pub fn create_link(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub fn create_link(link: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
pub fn create_link(_link: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}
