// ─── Archive Extraction ───
// Unpacks tar.gz and zip packages entry by entry, reproducing directories,
// file permissions and (tar only) symbolic links under a destination root.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform;

const DEFAULT_FILE_MODE: u32 = 0o644;
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// The format JDK packages are published in for the current OS.
    pub fn for_current_os() -> Self {
        if cfg!(target_os = "windows") {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }

    /// Guess the format from a file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".zip") || name.ends_with(".jar") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

/// Extract `archive` under `dest_root`.
///
/// Entries are processed in archive order; the first failure aborts and
/// whatever was already written stays on disk.
pub fn extract(dest_root: &Path, archive: &Path, format: ArchiveFormat) -> LauncherResult<()> {
    info!("Extracting {:?} into {:?}", archive, dest_root);
    platform::create_parents(dest_root).map_err(|e| LauncherError::io(dest_root, e))?;

    match format {
        ArchiveFormat::TarGz => extract_tar_gz(dest_root, archive),
        ArchiveFormat::Zip => extract_zip(dest_root, archive),
    }
}

/// [`extract`] on the blocking pool, for use from async code.
pub async fn extract_async(
    dest_root: &Path,
    archive: &Path,
    format: ArchiveFormat,
) -> LauncherResult<()> {
    let dest_root = dest_root.to_path_buf();
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || extract(&dest_root, &archive, format))
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?
}

/// Resolve an entry name under `dest_root`, refusing absolute paths, `..`
/// and any path that passes through a symlink already on disk.
fn entry_destination(dest_root: &Path, entry: &Path, archive: &Path) -> LauncherResult<PathBuf> {
    let unsafe_path = || LauncherError::UnsafeEntryPath {
        entry: entry.display().to_string(),
        archive: archive.to_path_buf(),
    };

    let mut dest = dest_root.to_path_buf();
    for component in entry.components() {
        match component {
            Component::Normal(part) => {
                dest.push(part);
                let is_link = std::fs::symlink_metadata(&dest)
                    .map(|meta| meta.file_type().is_symlink())
                    .unwrap_or(false);
                if is_link {
                    return Err(unsafe_path());
                }
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path())
            }
        }
    }
    Ok(dest)
}

fn write_file<R: Read>(reader: &mut R, dest: &Path, mode: u32) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        platform::create_parents(parent)?;
    }
    {
        let mut out = platform::create_file_with_mode(dest, mode)?;
        io::copy(reader, &mut out)?;
    }
    platform::apply_mode(dest, mode)
}

// ── tar.gz ──────────────────────────────────────────────

fn extract_tar_gz(dest_root: &Path, archive_path: &Path) -> LauncherResult<()> {
    let wrap = |source| LauncherError::Extract {
        archive: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(wrap)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);

    for entry in archive.entries().map_err(wrap)? {
        let mut entry = entry.map_err(wrap)?;
        let entry_path = entry.path().map_err(wrap)?.into_owned();
        let entry_type = entry.header().entry_type();

        // PAX global headers only carry metadata for the entries that follow.
        if entry_type == EntryType::XGlobalHeader {
            continue;
        }

        let dest = entry_destination(dest_root, &entry_path, archive_path)?;

        match entry_type {
            EntryType::Directory => {
                platform::create_parents(&dest).map_err(wrap)?;
            }
            EntryType::Regular | EntryType::Continuous => {
                let mode = entry.header().mode().map_err(wrap)?;
                write_file(&mut entry, &dest, mode).map_err(wrap)?;
            }
            EntryType::Symlink => {
                let target = entry
                    .link_name()
                    .map_err(wrap)?
                    .ok_or_else(|| LauncherError::UnsupportedEntry {
                        entry: format!("{} (symlink without target)", entry_path.display()),
                        archive: archive_path.to_path_buf(),
                    })?
                    .into_owned();
                if let Some(parent) = dest.parent() {
                    platform::create_parents(parent).map_err(wrap)?;
                }
                platform::create_link(&dest, &target).map_err(wrap)?;
            }
            _ => {
                return Err(LauncherError::UnsupportedEntry {
                    entry: entry_path.display().to_string(),
                    archive: archive_path.to_path_buf(),
                })
            }
        }

        debug!("Extracted {:?}", entry_path);
    }

    Ok(())
}

// ── zip ─────────────────────────────────────────────────

fn extract_zip(dest_root: &Path, archive_path: &Path) -> LauncherResult<()> {
    let wrap = |source| LauncherError::Extract {
        archive: archive_path.to_path_buf(),
        source,
    };
    let wrap_zip = |source| LauncherError::Zip {
        archive: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(wrap)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(wrap_zip)?;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index).map_err(wrap_zip)?;
        let name = zipped.name().to_string();
        let dest = entry_destination(dest_root, Path::new(&name), archive_path)?;

        if zipped.is_dir() {
            platform::create_parents(&dest).map_err(wrap)?;
        } else if zipped
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
        {
            return Err(LauncherError::UnsupportedEntry {
                entry: name,
                archive: archive_path.to_path_buf(),
            });
        } else {
            let mode = zipped.unix_mode().unwrap_or(DEFAULT_FILE_MODE);
            write_file(&mut zipped, &dest, mode).map_err(wrap)?;
        }

        debug!("Extracted {}", name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const CONTENT: &[u8] = b"#!/bin/sh\necho hello\n";

    fn tar_header(path: &str, entry_type: EntryType, mode: u32, size: u64) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_path(path).unwrap();
        header.set_entry_type(entry_type);
        header.set_mode(mode);
        header.set_size(size);
        header
    }

    fn build_tar_gz(path: &Path, extra: impl FnOnce(&mut tar::Builder<GzEncoder<File>>)) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        let mut dir = tar_header("jdk/bin/", EntryType::Directory, 0o755, 0);
        dir.set_cksum();
        builder.append(&dir, io::empty()).unwrap();

        let mut regular = tar_header("jdk/bin/java", EntryType::Regular, 0o644, CONTENT.len() as u64);
        regular.set_cksum();
        builder.append(&regular, CONTENT).unwrap();

        let mut link = tar_header("jdk/bin/java-link", EntryType::Symlink, 0o777, 0);
        link.set_link_name("java").unwrap();
        link.set_cksum();
        builder.append(&link, io::empty()).unwrap();

        extra(&mut builder);
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn tar_gz_reproduces_tree_modes_and_links() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("jdk.tar.gz");
        build_tar_gz(&archive, |_| {});

        let dest = temp.path().join("out");
        extract(&dest, &archive, ArchiveFormat::TarGz).unwrap();

        assert!(dest.join("jdk/bin").is_dir());
        assert_eq!(std::fs::read(dest.join("jdk/bin/java")).unwrap(), CONTENT);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dest.join("jdk/bin/java"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o644);

            let link = dest.join("jdk/bin/java-link");
            assert!(std::fs::symlink_metadata(&link)
                .unwrap()
                .file_type()
                .is_symlink());
            assert_eq!(std::fs::read_link(&link).unwrap(), PathBuf::from("java"));
            assert_eq!(std::fs::read(&link).unwrap(), CONTENT);
        }
    }

    #[test]
    fn tar_gz_rejects_unknown_entry_kind() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("fifo.tar.gz");
        build_tar_gz(&archive, |builder| {
            let mut fifo = tar_header("jdk/pipe", EntryType::Fifo, 0o644, 0);
            fifo.set_cksum();
            builder.append(&fifo, io::empty()).unwrap();
        });

        let err = extract(&temp.path().join("out"), &archive, ArchiveFormat::TarGz).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        let message = err.to_string();
        assert!(message.contains("jdk/pipe"));
        assert!(message.contains("fifo.tar.gz"));
        // Entries before the bad one stay extracted.
        assert!(temp.path().join("out/jdk/bin/java").exists());
    }

    #[test]
    fn tar_gz_rejects_parent_traversal() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("evil.tar.gz");
        build_tar_gz(&archive, |builder| {
            let mut header = tar::Header::new_gnu();
            // set_path refuses `..`, so write the raw name field.
            let name = b"../escape.txt";
            header.as_old_mut().name[..name.len()].copy_from_slice(name);
            header.set_entry_type(EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(1);
            header.set_cksum();
            builder.append(&header, &b"x"[..]).unwrap();
        });

        let out = temp.path().join("out");
        let err = extract(&out, &archive, ArchiveFormat::TarGz).unwrap_err();
        assert!(matches!(err, LauncherError::UnsafeEntryPath { .. }));
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn missing_archive_names_the_path() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("absent.tar.gz");
        let err = extract(&temp.path().join("out"), &archive, ArchiveFormat::TarGz).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(err.to_string().contains("absent.tar.gz"));
    }

    #[test]
    fn zip_reproduces_tree_and_modes() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("jdk.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let dir_options =
                zip::write::SimpleFileOptions::default().unix_permissions(0o755);
            let file_options =
                zip::write::SimpleFileOptions::default().unix_permissions(0o644);
            writer.add_directory("jdk/bin/", dir_options).unwrap();
            writer.start_file("jdk/bin/java.exe", file_options).unwrap();
            writer.write_all(CONTENT).unwrap();
            writer.finish().unwrap();
        }

        let dest = temp.path().join("out");
        extract(&dest, &archive, ArchiveFormat::Zip).unwrap();

        assert!(dest.join("jdk/bin").is_dir());
        assert_eq!(std::fs::read(dest.join("jdk/bin/java.exe")).unwrap(), CONTENT);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dest.join("jdk/bin/java.exe"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o644);
        }
    }

    #[cfg(unix)]
    #[test]
    fn tar_gz_refuses_to_write_through_extracted_symlink() {
        let temp = tempfile::tempdir().unwrap();
        let outside = temp.path().join("outside");
        std::fs::create_dir(&outside).unwrap();

        let archive = temp.path().join("linked.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

            let mut link = tar_header("jdk", EntryType::Symlink, 0o777, 0);
            link.set_link_name(&outside).unwrap();
            link.set_cksum();
            builder.append(&link, io::empty()).unwrap();

            let mut through = tar_header("jdk/planted.txt", EntryType::Regular, 0o644, 1);
            through.set_cksum();
            builder.append(&through, &b"x"[..]).unwrap();

            builder.into_inner().unwrap().finish().unwrap();
        }

        let err = extract(&temp.path().join("out"), &archive, ArchiveFormat::TarGz).unwrap_err();
        assert!(matches!(err, LauncherError::UnsafeEntryPath { .. }));
        assert!(!outside.join("planted.txt").exists());
    }

    #[test]
    fn tar_gz_skips_pax_global_header() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("pax.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

            let record = b"22 comment=build 1234\n";
            let mut global = tar::Header::new_ustar();
            global.set_path("pax_global_header").unwrap();
            global.set_entry_type(EntryType::XGlobalHeader);
            global.set_mode(0o644);
            global.set_size(record.len() as u64);
            global.set_cksum();
            builder.append(&global, &record[..]).unwrap();

            let mut regular = tar_header("jdk/release", EntryType::Regular, 0o644, CONTENT.len() as u64);
            regular.set_cksum();
            builder.append(&regular, CONTENT).unwrap();

            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = temp.path().join("out");
        extract(&dest, &archive, ArchiveFormat::TarGz).unwrap();

        assert_eq!(std::fs::read(dest.join("jdk/release")).unwrap(), CONTENT);
        assert!(!dest.join("pax_global_header").exists());
    }

    #[test]
    fn zip_rejects_symlink_entry() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("links.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.add_symlink("jdk/bin/java-link", "java", options).unwrap();
            writer.finish().unwrap();
        }

        let err = extract(&temp.path().join("out"), &archive, ArchiveFormat::Zip).unwrap_err();
        assert!(matches!(err, LauncherError::UnsupportedEntry { .. }));
        assert!(err.to_string().contains("jdk/bin/java-link"));
    }

    #[test]
    fn zip_rejects_parent_traversal() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("evil.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
            writer.start_file("../escape.txt", options).unwrap();
            writer.write_all(b"x").unwrap();
            writer.finish().unwrap();
        }

        let out = temp.path().join("out");
        let err = extract(&out, &archive, ArchiveFormat::Zip).unwrap_err();
        assert!(matches!(err, LauncherError::UnsafeEntryPath { .. }));
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn format_from_path() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("OpenJDK17U-jre_x64_linux.tar.gz")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("jdk.ZIP")),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::from_path(Path::new("notes.txt")), None);
    }
}
