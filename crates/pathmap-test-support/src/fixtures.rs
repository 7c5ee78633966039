//! Template tree and archive fixtures.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Result, bail};
use flate2::Compression as GzCompression;
use flate2::write::GzEncoder;
use zip::CompressionMethod;
use zip::write::FileOptions;

/// A file or directory to place inside a fixture archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path of the entry inside the archive, `/`-separated.
    pub path: String,
    /// File contents, or `None` for a directory entry.
    pub contents: Option<Vec<u8>>,
}

impl ArchiveEntry {
    /// Regular file entry.
    #[must_use]
    pub fn file(path: &str, contents: impl AsRef<[u8]>) -> Self {
        Self {
            path: path.to_string(),
            contents: Some(contents.as_ref().to_vec()),
        }
    }

    /// Directory entry.
    #[must_use]
    pub fn dir(path: &str) -> Self {
        Self {
            path: path.to_string(),
            contents: None,
        }
    }
}

/// Write each `(relative path, contents)` pair under `root`, creating parents.
///
/// # Errors
///
/// Returns an error if any directory or file cannot be created.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) -> Result<()> {
    for (relative, contents) in files {
        let destination = root.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&destination, contents)?;
    }
    Ok(())
}

/// Build a zip archive at `path` containing `entries`.
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
pub fn write_zip(path: &Path, entries: &[ArchiveEntry]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in entries {
        match &entry.contents {
            Some(contents) => {
                writer.start_file(entry.path.as_str(), options)?;
                writer.write_all(contents)?;
            }
            None => writer.add_directory(entry.path.as_str(), options)?,
        }
    }
    writer.finish()?;
    Ok(())
}

/// Build a tar archive at `path`; compression follows the suffix
/// (`.tar`, `.tar.gz`/`.tgz`, `.tar.bz`/`.tar.bz2`).
///
/// # Errors
///
/// Returns an error for unknown suffixes or if the archive cannot be written.
pub fn write_tar(path: &Path, entries: &[ArchiveEntry]) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let file = File::create(path)?;

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let encoder = GzEncoder::new(file, GzCompression::default());
        append_tar_entries(encoder, entries)?.finish()?;
    } else if name.ends_with(".tar.bz") || name.ends_with(".tar.bz2") {
        let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
        append_tar_entries(encoder, entries)?.finish()?;
    } else if name.ends_with(".tar") {
        append_tar_entries(file, entries)?.flush()?;
    } else {
        bail!("unsupported fixture archive name '{name}'");
    }
    Ok(())
}

fn append_tar_entries<W: Write>(writer: W, entries: &[ArchiveEntry]) -> Result<W> {
    let mut builder = tar::Builder::new(writer);
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match &entry.contents {
            Some(contents) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(u64::try_from(contents.len())?);
                header.set_mode(0o644);
                builder.append_data(&mut header, &entry.path, contents.as_slice())?;
            }
            None => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                builder.append_data(&mut header, &entry.path, io::empty())?;
            }
        }
    }
    Ok(builder.into_inner()?)
}
