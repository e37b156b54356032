//! Archive extraction (tar+gzip and zip) into the archive's own directory
//!
//! # Security
//!
//! - Entry names are normalized before use; `..`, absolute roots and drive
//!   prefixes are rejected with [`ExtractError::PathTraversal`]
//! - Symlinks, hardlinks and device entries are never materialized
//!
//! # Atomicity
//!
//! Each file is written to a temporary file next to its final location,
//! synced, and renamed into place before the next entry is read. Every path
//! created during a pass is journaled; if the pass fails, the journal is
//! unwound in reverse order so the destination holds only what existed before.

use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Supported archive container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Selects the format from the file name alone
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(ArchiveFormat::TarGz)
        } else if name.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else {
            Err(ExtractError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }

    /// Whether `name` looks like an archive this module can unpack
    pub fn is_archive_name(name: &str) -> bool {
        Self::from_path(Path::new(name)).is_ok()
    }
}

/// Classification of one archive record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, hardlinks, devices, FIFOs; never extracted
    Other,
}

/// A view of one record during the extraction pass
#[derive(Debug, Clone, Copy)]
struct ArchiveEntry<'a> {
    name: &'a str,
    kind: EntryKind,
    mode: Option<u32>,
}

/// What an extraction pass produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub destination: PathBuf,
    pub files: usize,
    pub directories: usize,
    /// Entries of kind [`EntryKind::Other`] or with an empty name
    pub skipped: usize,
}

/// Extracts `archive_path` into its parent directory
///
/// # Errors
///
/// - [`ExtractError::UnsupportedFormat`] for unknown extensions
/// - [`ExtractError::Corrupt`] when the container cannot be decoded
/// - [`ExtractError::PathTraversal`] for entries escaping the destination
/// - [`ExtractError::Io`] on filesystem failures
///
/// On any error, paths created by this call have already been removed.
pub fn extract(archive_path: &Path) -> Result<ExtractSummary, ExtractError> {
    let destination = match archive_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    extract_to(archive_path, &destination)
}

/// Extracts `archive_path` into `destination`
pub fn extract_to(archive_path: &Path, destination: &Path) -> Result<ExtractSummary, ExtractError> {
    let format = ArchiveFormat::from_path(archive_path)?;

    let bytes = fs::read(archive_path).map_err(|e| ExtractError::Io {
        operation: format!("read archive {}", archive_path.display()),
        source: e,
    })?;

    tracing::debug!(
        "extracting {} ({:?}, {} bytes) into {}",
        archive_path.display(),
        format,
        bytes.len(),
        destination.display()
    );

    let mut pass = Extraction::new(archive_path, destination);
    let outcome = match format {
        ArchiveFormat::TarGz => pass.tar_gz(&bytes),
        ArchiveFormat::Zip => pass.zip(&bytes),
    };

    match outcome {
        Ok(()) => {
            tracing::debug!(
                "extracted {} files, {} directories ({} skipped)",
                pass.summary.files,
                pass.summary.directories,
                pass.summary.skipped
            );
            Ok(pass.summary)
        }
        Err(err) => {
            tracing::warn!(
                "extraction of {} failed, rolling back: {}",
                archive_path.display(),
                err
            );
            pass.journal.rollback();
            Err(err)
        }
    }
}

/// Normalizes an entry name into a path relative to the destination
///
/// Returns `Ok(None)` for names that normalize to nothing (`./`, empty).
pub(crate) fn safe_relative_path(name: &str) -> Result<Option<PathBuf>, ExtractError> {
    let traversal = || ExtractError::PathTraversal {
        entry: name.to_string(),
    };

    if name.starts_with('/') || name.starts_with('\\') {
        return Err(traversal());
    }

    let mut path = PathBuf::new();
    for (index, part) in name.split(['/', '\\']).enumerate() {
        match part {
            "" | "." => continue,
            ".." => return Err(traversal()),
            _ if index == 0 && is_drive_prefix(part) => return Err(traversal()),
            _ => path.push(part),
        }
    }

    Ok((!path.as_os_str().is_empty()).then_some(path))
}

fn is_drive_prefix(part: &str) -> bool {
    let bytes = part.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// One extraction pass: destination, journal and running counts
struct Extraction<'a> {
    archive: &'a Path,
    destination: &'a Path,
    journal: Journal,
    summary: ExtractSummary,
}

impl<'a> Extraction<'a> {
    fn new(archive: &'a Path, destination: &'a Path) -> Self {
        Self {
            archive,
            destination,
            journal: Journal::default(),
            summary: ExtractSummary {
                destination: destination.to_path_buf(),
                ..ExtractSummary::default()
            },
        }
    }

    fn corrupt(&self, reason: impl ToString) -> ExtractError {
        ExtractError::Corrupt {
            path: self.archive.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    fn tar_gz(&mut self, bytes: &[u8]) -> Result<(), ExtractError> {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .map_err(|e| self.corrupt(e))?;

        let mut archive = tar::Archive::new(&decoded[..]);
        let entries = archive.entries().map_err(|e| self.corrupt(e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| self.corrupt(e))?;
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let entry_type = entry.header().entry_type();
            let kind = if entry_type.is_dir() {
                EntryKind::Directory
            } else if entry_type.is_file() || entry_type.is_contiguous() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            let mode = entry.header().mode().ok();

            self.apply(ArchiveEntry { name: &name, kind, mode }, &mut entry)?;
        }

        Ok(())
    }

    fn zip(&mut self, bytes: &[u8]) -> Result<(), ExtractError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| self.corrupt(e))?;

        for index in 0..archive.len() {
            let mut file = archive.by_index(index).map_err(|e| self.corrupt(e))?;
            let name = file.name().to_string();
            let kind = if file.is_dir() {
                EntryKind::Directory
            } else if file.is_symlink() {
                EntryKind::Other
            } else {
                EntryKind::File
            };
            let mode = file.unix_mode();

            self.apply(ArchiveEntry { name: &name, kind, mode }, &mut file)?;
        }

        Ok(())
    }

    fn apply(&mut self, entry: ArchiveEntry<'_>, content: &mut dyn Read) -> Result<(), ExtractError> {
        if entry.kind == EntryKind::Other {
            tracing::debug!("skipping non-regular entry '{}'", entry.name);
            self.summary.skipped += 1;
            return Ok(());
        }

        let Some(relative) = safe_relative_path(entry.name)? else {
            self.summary.skipped += 1;
            return Ok(());
        };
        let target = self.destination.join(&relative);

        match entry.kind {
            EntryKind::Directory => {
                self.journal
                    .create_dir_all(&target)
                    .map_err(|e| ExtractError::Io {
                        operation: format!("create directory {}", target.display()),
                        source: e,
                    })?;
                self.summary.directories += 1;
            }
            EntryKind::File => {
                self.journal
                    .write_file(&target, content, entry.mode)
                    .map_err(|e| ExtractError::Io {
                        operation: format!("write {}", target.display()),
                        source: e,
                    })?;
                self.summary.files += 1;
            }
            EntryKind::Other => {}
        }

        Ok(())
    }
}

/// Paths created during one pass, in creation order
#[derive(Debug, Default)]
struct Journal {
    created: Vec<PathBuf>,
}

impl Journal {
    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        let mut missing = Vec::new();
        let mut current = Some(path);
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() || dir.exists() {
                break;
            }
            missing.push(dir.to_path_buf());
            current = dir.parent();
        }

        for dir in missing.into_iter().rev() {
            match fs::create_dir(&dir) {
                Ok(()) => self.created.push(dir),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
                Err(e) => return Err(e),
            }
        }

        if !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a directory", path.display()),
            ));
        }
        Ok(())
    }

    fn write_file(&mut self, path: &Path, content: &mut dyn Read, mode: Option<u32>) -> io::Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        self.create_dir_all(parent)?;

        let existed = path.exists();

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        io::copy(content, &mut temp_file)?;
        temp_file.as_file().sync_all()?;

        #[cfg(unix)]
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp_file.path(), fs::Permissions::from_mode(mode & 0o777))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        temp_file.persist(path).map_err(|e| e.error)?;

        if !existed {
            self.created.push(path.to_path_buf());
        }
        Ok(())
    }

    fn rollback(self) {
        for path in self.created.into_iter().rev() {
            let removed = if path.is_dir() {
                fs::remove_dir(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = removed {
                tracing::warn!("could not remove {} during rollback: {}", path.display(), e);
            }
        }
    }
}

/// Extraction error types
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("EXTRACT_FAILED: unsupported archive format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("EXTRACT_FAILED: archive entry '{entry}' escapes the destination directory")]
    PathTraversal { entry: String },

    #[error("EXTRACT_FAILED: corrupt archive {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("EXTRACT_FAILED: I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use skcanvas_testkit::{FixtureEntry, tar_gz_bytes, temp_dir_in_workspace, write_fixture, zip_bytes};

    fn entry_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .map(|e| {
                e.path()
                    .strip_prefix(dir)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("a/canvas.tar.gz")).unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("canvas-1.0.0.TGZ")).unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("fonts.zip")).unwrap(),
            ArchiveFormat::Zip
        );
        assert!(matches!(
            ArchiveFormat::from_path(Path::new("fonts.rar")),
            Err(ExtractError::UnsupportedFormat { .. })
        ));
        assert!(ArchiveFormat::from_path(Path::new("NotoSans.ttf")).is_err());
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(
            safe_relative_path("package/skia.node").unwrap(),
            Some(PathBuf::from("package").join("skia.node"))
        );
        assert_eq!(
            safe_relative_path("./package//a.txt").unwrap(),
            Some(PathBuf::from("package").join("a.txt"))
        );
        assert_eq!(safe_relative_path("./").unwrap(), None);
        assert_eq!(safe_relative_path("").unwrap(), None);

        for name in ["../escape.txt", "a/../../b", "/etc/passwd", "\\evil", "C:\\evil", "c:/x"] {
            assert!(
                matches!(safe_relative_path(name), Err(ExtractError::PathTraversal { .. })),
                "{name} must be rejected"
            );
        }
    }

    #[test]
    fn test_tar_gz_directory_then_file() {
        let temp = temp_dir_in_workspace();
        let archive = write_fixture(
            temp.path(),
            "canvas.tgz",
            &tar_gz_bytes(&[
                FixtureEntry::Dir("package/"),
                FixtureEntry::File("package/skia.linux-x64-gnu.node", b"native"),
                FixtureEntry::File("package/package.json", b"{}"),
            ]),
        );

        let summary = extract(&archive).unwrap();

        assert_eq!(summary.destination, temp.path());
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.files, 2);
        assert_eq!(
            fs::read(temp.path().join("package/skia.linux-x64-gnu.node")).unwrap(),
            b"native"
        );
        assert_eq!(
            entry_names(temp.path()),
            vec![
                "canvas.tgz",
                "package",
                "package/package.json",
                "package/skia.linux-x64-gnu.node"
            ]
        );
    }

    #[test]
    fn test_tar_gz_file_without_directory_entry() {
        let temp = temp_dir_in_workspace();
        let archive = write_fixture(
            temp.path(),
            "nested.tar.gz",
            &tar_gz_bytes(&[FixtureEntry::File("a/b/c.txt", b"deep")]),
        );

        extract(&archive).unwrap();
        assert_eq!(fs::read(temp.path().join("a/b/c.txt")).unwrap(), b"deep");
    }

    /// Paths journaled by one tar.gz pass, relative to the destination
    fn creation_order(entries: &[FixtureEntry<'_>]) -> Vec<String> {
        let temp = temp_dir_in_workspace();
        let archive = temp.path().join("order.tgz");
        let mut extraction = Extraction::new(&archive, temp.path());
        extraction.tar_gz(&tar_gz_bytes(entries)).unwrap();

        extraction
            .journal
            .created
            .iter()
            .map(|p| {
                p.strip_prefix(temp.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_directory_created_before_its_files() {
        let order = creation_order(&[
            FixtureEntry::Dir("package/"),
            FixtureEntry::File("package/x", b"x"),
        ]);
        assert_eq!(order, vec!["package", "package/x"]);
    }

    #[test]
    fn test_implicit_parents_created_before_file() {
        let order = creation_order(&[
            FixtureEntry::File("a/b/c.txt", b"deep"),
            FixtureEntry::File("a/d.txt", b"shallow"),
        ]);
        assert_eq!(order, vec!["a", "a/b", "a/b/c.txt", "a/d.txt"]);
    }

    #[test]
    fn test_tar_gz_symlink_is_skipped() {
        let temp = temp_dir_in_workspace();
        let archive = write_fixture(
            temp.path(),
            "links.tgz",
            &tar_gz_bytes(&[
                FixtureEntry::File("real.txt", b"data"),
                FixtureEntry::Symlink("link.txt", "real.txt"),
            ]),
        );

        let summary = extract(&archive).unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!temp.path().join("link.txt").exists());
        assert!(temp.path().join("link.txt").symlink_metadata().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_gz_keeps_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let temp = temp_dir_in_workspace();
        let archive = write_fixture(
            temp.path(),
            "mode.tgz",
            &tar_gz_bytes(&[FixtureEntry::File("file.txt", b"x")]),
        );
        extract(&archive).unwrap();

        let mode = fs::metadata(temp.path().join("file.txt")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_traversal_is_rejected_and_rolled_back() {
        let temp = temp_dir_in_workspace();
        let dest = temp.path().join("dest");
        let archive = write_fixture(
            &dest,
            "evil.tgz",
            &tar_gz_bytes(&[
                FixtureEntry::Dir("pkg/"),
                FixtureEntry::File("pkg/ok.txt", b"fine"),
                FixtureEntry::File("../escape.txt", b"pwned"),
            ]),
        );

        let err = extract(&archive).unwrap_err();

        assert!(matches!(err, ExtractError::PathTraversal { ref entry } if entry == "../escape.txt"));
        assert!(!temp.path().join("escape.txt").exists());
        assert_eq!(entry_names(&dest), vec!["evil.tgz"], "pass must be rolled back");
    }

    #[test]
    fn test_rollback_keeps_preexisting_directories() {
        let temp = temp_dir_in_workspace();
        fs::create_dir_all(temp.path().join("package")).unwrap();
        fs::write(temp.path().join("package/existing.txt"), b"keep").unwrap();

        let archive = write_fixture(
            temp.path(),
            "partial.zip",
            &zip_bytes(&[
                FixtureEntry::File("package/new.txt", b"new"),
                FixtureEntry::File("/abs.txt", b"bad"),
            ]),
        );

        assert!(extract(&archive).is_err());
        assert_eq!(
            entry_names(temp.path()),
            vec!["package", "package/existing.txt", "partial.zip"]
        );
    }

    #[test]
    fn test_zip_directory_markers_and_files() {
        let temp = temp_dir_in_workspace();
        let archive = write_fixture(
            temp.path(),
            "fonts.zip",
            &zip_bytes(&[
                FixtureEntry::Dir("fonts/"),
                FixtureEntry::File("fonts/NotoSansSC-Regular.otf", b"otf bytes"),
            ]),
        );

        let summary = extract(&archive).unwrap();
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.files, 1);
        assert!(temp.path().join("fonts").is_dir());
        assert_eq!(
            fs::read(temp.path().join("fonts/NotoSansSC-Regular.otf")).unwrap(),
            b"otf bytes"
        );
    }

    #[test]
    fn test_zip_with_only_directory_entry() {
        let temp = temp_dir_in_workspace();
        let archive = write_fixture(
            temp.path(),
            "empty.zip",
            &zip_bytes(&[FixtureEntry::Dir("fonts/")]),
        );

        let summary = extract(&archive).unwrap();
        assert_eq!(summary.files, 0);
        assert!(temp.path().join("fonts").is_dir());
        assert_eq!(entry_names(&temp.path().join("fonts")), Vec::<String>::new());
    }

    #[test]
    fn test_zip_symlink_is_skipped() {
        let temp = temp_dir_in_workspace();
        let archive = write_fixture(
            temp.path(),
            "links.zip",
            &zip_bytes(&[
                FixtureEntry::File("a.ttf", b"font"),
                FixtureEntry::Symlink("b.ttf", "a.ttf"),
            ]),
        );

        let summary = extract(&archive).unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.skipped, 1);
        assert!(temp.path().join("b.ttf").symlink_metadata().is_err());
    }

    #[test]
    fn test_corrupt_archive() {
        let temp = temp_dir_in_workspace();
        let tar = write_fixture(temp.path(), "broken.tgz", b"definitely not gzip");
        let zip = write_fixture(temp.path(), "broken.zip", b"definitely not zip");

        assert!(matches!(extract(&tar), Err(ExtractError::Corrupt { .. })));
        assert!(matches!(extract(&zip), Err(ExtractError::Corrupt { .. })));
        assert_eq!(entry_names(temp.path()), vec!["broken.tgz", "broken.zip"]);
    }

    #[test]
    fn test_unsupported_extension_touches_nothing() {
        let temp = temp_dir_in_workspace();
        let archive = write_fixture(temp.path(), "fonts.7z", b"7z");
        assert!(matches!(
            extract(&archive),
            Err(ExtractError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_missing_archive_is_io_error() {
        let temp = temp_dir_in_workspace();
        let err = extract(&temp.path().join("absent.tgz")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn test_reextraction_overwrites_files() {
        let temp = temp_dir_in_workspace();
        fs::write(temp.path().join("font.ttf"), b"old").unwrap();
        let archive = write_fixture(
            temp.path(),
            "update.tgz",
            &tar_gz_bytes(&[FixtureEntry::File("font.ttf", b"new")]),
        );

        extract(&archive).unwrap();
        assert_eq!(fs::read(temp.path().join("font.ttf")).unwrap(), b"new");
    }
}
