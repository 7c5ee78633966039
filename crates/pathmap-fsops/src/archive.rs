//! Archive extraction with a single-root contract.
//!
//! # Design
//! - The archive kind is chosen from the file name suffix, never by sniffing content.
//! - Extraction happens next to the archive; the set difference of the directory
//!   listing before and after must be exactly one entry, which becomes the source root.
//! - Entry paths are contained within the extraction directory.

use std::{
    collections::BTreeSet,
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tracing::{debug, info, warn};
use zip::ZipArchive;
use zip::read::ZipFile;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::error::{FsOpsError, FsOpsResult};

/// Archive formats understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.zip`
    Zip,
    /// `.tar`
    Tar,
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.tar.bz` / `.tar.bz2`
    TarBz2,
}

impl ArchiveKind {
    /// Determine the archive kind from the file name suffix.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Unsupported`] for unknown suffixes and
    /// [`FsOpsError::InvalidInput`] when the path has no UTF-8 file name.
    pub fn from_path(path: &Path) -> FsOpsResult<Self> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| FsOpsError::InvalidInput {
                field: "archive_name",
                reason: "missing",
                value: Some(path.to_string_lossy().into_owned()),
            })?;

        let kind = if name.ends_with(".zip") {
            Self::Zip
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Self::TarGz
        } else if name.ends_with(".tar.bz") || name.ends_with(".tar.bz2") {
            Self::TarBz2
        } else if name.ends_with(".tar") {
            Self::Tar
        } else {
            return Err(FsOpsError::Unsupported {
                operation: "extract_archive",
                value: Some(name.to_string()),
            });
        };
        Ok(kind)
    }

    /// Short label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
        }
    }
}

/// Extract `archive` into its parent directory and return the single top-level
/// entry the extraction produced.
///
/// # Errors
///
/// Returns [`FsOpsError::ExtractionRoot`] when the extraction creates zero or
/// several top-level entries, and propagates IO and archive decoding failures.
pub fn extract_single_root(archive: &Path) -> FsOpsResult<PathBuf> {
    let parent = archive
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let before = list_entries(parent)?;
    info!(
        archive = %archive.display(),
        destination = %parent.display(),
        "extracting archive"
    );
    extract_archive(archive, parent)?;
    let after = list_entries(parent)?;

    let mut created: Vec<String> = after.difference(&before).cloned().collect();
    if created.len() != 1 {
        return Err(FsOpsError::ExtractionRoot {
            path: parent.to_path_buf(),
            entries: created,
        });
    }

    let root = parent.join(created.remove(0));
    debug!(root = %root.display(), "archive extracted to single root");
    Ok(root)
}

/// Extract `source` into the `target` directory, creating it when missing.
///
/// # Errors
///
/// Returns an error when the archive kind is unsupported, the archive cannot be
/// decoded, or an entry would escape `target`.
pub fn extract_archive(source: &Path, target: &Path) -> FsOpsResult<()> {
    let kind = ArchiveKind::from_path(source)?;
    ensure_dir(target, "extract_archive.create_target")?;
    debug!(kind = kind.as_str(), archive = %source.display(), "decoding archive");

    match kind {
        ArchiveKind::Zip => extract_zip(source, target),
        ArchiveKind::Tar => extract_tar(open_archive(source)?, source, target),
        ArchiveKind::TarGz => extract_tar(GzDecoder::new(open_archive(source)?), source, target),
        ArchiveKind::TarBz2 => extract_tar(BzDecoder::new(open_archive(source)?), source, target),
    }
}

fn open_archive(source: &Path) -> FsOpsResult<File> {
    File::open(source).map_err(|source_err| FsOpsError::io("extract_archive.open", source, source_err))
}

fn extract_zip(source: &Path, target: &Path) -> FsOpsResult<()> {
    let mut archive = ZipArchive::new(open_archive(source)?)
        .map_err(|source_err| FsOpsError::zip("extract_zip.decode", source, source_err))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source_err| FsOpsError::zip("extract_zip.read_entry", source, source_err))?;
        // `enclosed_name` refuses absolute names and names climbing above the root.
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            return Err(FsOpsError::InvalidInput {
                field: "archive_entry",
                reason: "escapes_root",
                value: Some(entry.name().to_string()),
            });
        };
        let destination = target.join(relative);
        if entry.is_dir() {
            ensure_dir(&destination, "extract_zip.create_dir")?;
        } else {
            unpack_zip_file(&mut entry, &destination)?;
        }
    }

    Ok(())
}

fn unpack_zip_file(entry: &mut ZipFile<'_>, destination: &Path) -> FsOpsResult<()> {
    if let Some(parent) = destination.parent() {
        ensure_dir(parent, "extract_zip.create_parent")?;
    }
    let mut output = File::create(destination)
        .map_err(|source_err| FsOpsError::io("extract_zip.create_file", destination, source_err))?;
    io::copy(entry, &mut output)
        .map_err(|source_err| FsOpsError::io("extract_zip.copy", destination, source_err))?;

    #[cfg(unix)]
    if let Some(mode) = entry.unix_mode() {
        output
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(|source_err| FsOpsError::io("extract_zip.set_mode", destination, source_err))?;
    }
    Ok(())
}

fn ensure_dir(path: &Path, operation: &'static str) -> FsOpsResult<()> {
    fs::create_dir_all(path).map_err(|source_err| FsOpsError::io(operation, path, source_err))
}

fn extract_tar<R: Read>(reader: R, source: &Path, target: &Path) -> FsOpsResult<()> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|source_err| FsOpsError::io("extract_tar.entries", source, source_err))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|source_err| FsOpsError::io("extract_tar.read_entry", source, source_err))?;
        let unpacked = entry
            .unpack_in(target)
            .map_err(|source_err| FsOpsError::io("extract_tar.unpack", target, source_err))?;
        if !unpacked {
            let name = entry
                .path()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            warn!(entry = %name, archive = %source.display(), "skipped tar entry outside extraction root");
        }
    }

    Ok(())
}

fn list_entries(dir: &Path) -> FsOpsResult<BTreeSet<String>> {
    let read_dir =
        fs::read_dir(dir).map_err(|source_err| FsOpsError::io("list_entries.read_dir", dir, source_err))?;
    let mut names = BTreeSet::new();
    for entry in read_dir {
        let entry =
            entry.map_err(|source_err| FsOpsError::io("list_entries.entry", dir, source_err))?;
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pathmap_test_support::fixtures::{self, ArchiveEntry};
    use tempfile::TempDir;

    fn project_entries() -> Vec<ArchiveEntry> {
        vec![
            ArchiveEntry::file("cms-1.0/index.php", b"<?php"),
            ArchiveEntry::file("cms-1.0/admin/config.php", b"<?php"),
            ArchiveEntry::file("cms-1.0/assets/site.css", b"body{}"),
        ]
    }

    #[test]
    fn archive_kind_follows_suffix() -> Result<()> {
        assert_eq!(ArchiveKind::from_path(Path::new("a.zip"))?, ArchiveKind::Zip);
        assert_eq!(ArchiveKind::from_path(Path::new("a.tar"))?, ArchiveKind::Tar);
        assert_eq!(ArchiveKind::from_path(Path::new("a.tar.gz"))?, ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::from_path(Path::new("a.tgz"))?, ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::from_path(Path::new("a.tar.bz"))?, ArchiveKind::TarBz2);
        assert_eq!(ArchiveKind::from_path(Path::new("a.tar.bz2"))?, ArchiveKind::TarBz2);
        Ok(())
    }

    #[test]
    fn extract_archive_rejects_unknown_extensions() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("payload.rar");
        fs::write(&source, b"junk")?;

        let err = extract_archive(&source, &temp.path().join("target"))
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected unsupported archive error"))?;
        assert!(matches!(
            err,
            FsOpsError::Unsupported {
                operation: "extract_archive",
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn zip_with_single_directory_yields_that_root() -> Result<()> {
        let temp = TempDir::new()?;
        let archive = temp.path().join("cms-1.0.zip");
        fixtures::write_zip(&archive, &project_entries())?;

        let root = extract_single_root(&archive)?;
        assert_eq!(root, temp.path().join("cms-1.0"));
        assert!(root.join("admin/config.php").is_file());
        assert!(root.join("assets/site.css").is_file());
        Ok(())
    }

    #[test]
    fn every_tar_flavour_yields_single_root() -> Result<()> {
        let temp = TempDir::new()?;
        let flavours = [
            ("plain", "cms.tar"),
            ("gzip", "cms.tar.gz"),
            ("bzip", "cms.tar.bz"),
        ];
        for (dir, name) in flavours {
            let work = temp.path().join(dir);
            fs::create_dir_all(&work)?;
            let archive = work.join(name);
            fixtures::write_tar(&archive, &project_entries())?;

            let root = extract_single_root(&archive)?;
            assert_eq!(root, work.join("cms-1.0"), "flavour {name}");
            assert!(root.join("index.php").is_file(), "flavour {name}");
        }
        Ok(())
    }

    #[test]
    fn archive_spraying_files_fails_extraction() -> Result<()> {
        let temp = TempDir::new()?;
        let archive = temp.path().join("flat.zip");
        fixtures::write_zip(
            &archive,
            &[
                ArchiveEntry::file("index.php", b"<?php"),
                ArchiveEntry::file("readme.txt", b"hi"),
            ],
        )?;

        let err = extract_single_root(&archive)
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected extraction root error"))?;
        match err {
            FsOpsError::ExtractionRoot { entries, .. } => {
                assert_eq!(entries, vec!["index.php".to_string(), "readme.txt".to_string()]);
            }
            other => anyhow::bail!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn empty_archive_fails_extraction() -> Result<()> {
        let temp = TempDir::new()?;
        let archive = temp.path().join("empty.tar.gz");
        fixtures::write_tar(&archive, &[])?;

        let err = extract_single_root(&archive)
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected extraction root error"))?;
        assert!(matches!(err, FsOpsError::ExtractionRoot { ref entries, .. } if entries.is_empty()));
        Ok(())
    }

    #[test]
    fn zip_entries_climbing_out_of_the_root_are_rejected() -> Result<()> {
        let temp = TempDir::new()?;
        let work = temp.path().join("work");
        fs::create_dir_all(&work)?;
        let archive = work.join("evil.zip");
        fixtures::write_zip(
            &archive,
            &[
                ArchiveEntry::file("cms/index.php", b"<?php"),
                ArchiveEntry::file("../escaped.php", b"<?php"),
            ],
        )?;

        let err = extract_archive(&archive, &work.join("out"))
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected escaping entry to be rejected"))?;
        assert!(matches!(
            err,
            FsOpsError::InvalidInput {
                reason: "escapes_root",
                ..
            }
        ));
        assert!(!work.join("escaped.php").exists());
        Ok(())
    }

    #[test]
    fn zip_dot_prefixed_entries_land_inside_the_root() -> Result<()> {
        let temp = TempDir::new()?;
        let archive = temp.path().join("dotted.zip");
        fixtures::write_zip(&archive, &[ArchiveEntry::file("./cms/index.php", b"<?php")])?;

        let root = extract_single_root(&archive)?;
        assert_eq!(root, temp.path().join("cms"));
        assert!(root.join("index.php").is_file());
        Ok(())
    }
}
