//! Template walker producing the relative paths to probe.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Component, Path};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};
use crate::model::{IgnoreSet, RelativePath};

/// Summary of a template walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    /// Paths kept after filtering, in walk order.
    pub paths: Vec<RelativePath>,
    /// Number of files seen under the root before filtering.
    pub files_seen: usize,
}

/// Walk `root` recursively and return every file path relative to it whose
/// extension is not in `ignored`.
///
/// Order follows the filesystem walk and is not sorted.
///
/// # Errors
///
/// Returns an error when the root is missing or the walk hits an unreadable entry.
pub fn enumerate_paths(root: &Path, ignored: &IgnoreSet) -> FsOpsResult<Enumeration> {
    info!(root = %root.display(), "walking template");
    let mut enumeration = Enumeration::default();

    for entry in WalkDir::new(root) {
        let entry = entry
            .map_err(|source| FsOpsError::walkdir("enumerate_paths.walk", root, source))?;
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }
        enumeration.files_seen += 1;

        if ignored.ignores(Path::new(entry.file_name())) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| FsOpsError::InvalidInput {
                field: "template_entry",
                reason: "outside_root",
                value: Some(entry.path().display().to_string()),
            })?;
        let path = to_relative_path(relative);
        if path.is_escaped() {
            debug!(path = %path, "escaped template entry with non UTF-8 name");
        }
        enumeration.paths.push(path);
    }

    debug!(
        files_seen = enumeration.files_seen,
        kept = enumeration.paths.len(),
        "template walk finished"
    );
    Ok(enumeration)
}

/// Join the path components with `/`; non UTF-8 names escape the whole path.
fn to_relative_path(relative: &Path) -> RelativePath {
    let segments: Vec<&OsStr> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment),
            Component::ParentDir => Some(OsStr::new("..")),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => None,
        })
        .collect();

    if let Some(text) = segments
        .iter()
        .map(|segment| segment.to_str())
        .collect::<Option<Vec<_>>>()
    {
        return RelativePath::new(text.join("/"));
    }

    let encoded: Vec<String> = segments
        .iter()
        .map(|segment| urlencoding::encode_binary(&segment_bytes(segment)).into_owned())
        .collect();
    RelativePath::escaped(encoded.join("/"))
}

#[cfg(unix)]
fn segment_bytes(segment: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(segment.as_bytes())
}

#[cfg(not(unix))]
fn segment_bytes(segment: &OsStr) -> Cow<'_, [u8]> {
    match segment.to_string_lossy() {
        Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
        Cow::Owned(text) => Cow::Owned(text.into_bytes()),
    }
}
