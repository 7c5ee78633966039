//! Domain models for template enumeration.
//!
//! # Design
//! - `RelativePath` is the unit of work handed to probers; it is immutable once built.
//! - `IgnoreSet` is resolved once from caller options and only answers membership queries.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

use serde::Serialize;

/// Extensions skipped by default unless image mapping is requested.
pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[".jpg", ".css", ".png", ".gif"];

/// File path relative to a template root, using `/` separators and no leading separator.
///
/// Names that are not valid UTF-8 are carried as an escaped path: every segment is
/// percent-encoded from its raw bytes, and the value is used verbatim as a URL path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RelativePath {
    value: String,
    #[serde(skip)]
    escaped: bool,
}

impl RelativePath {
    /// Build a relative path from a `/`-separated string, stripping one leading separator.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: strip_leading_separator(value.into()),
            escaped: false,
        }
    }

    /// Build a relative path whose segments are already percent-encoded.
    #[must_use]
    pub fn escaped(value: impl Into<String>) -> Self {
        Self {
            value: strip_leading_separator(value.into()),
            escaped: true,
        }
    }

    /// Returns `true` when the segments are already percent-encoded.
    #[must_use]
    pub const fn is_escaped(&self) -> bool {
        self.escaped
    }

    /// Borrow the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Iterate over the non-empty `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.value.split('/').filter(|segment| !segment.is_empty())
    }

    /// Consume the wrapper and return the owned string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.value
    }
}

fn strip_leading_separator(value: String) -> String {
    match value.strip_prefix('/') {
        Some(stripped) => stripped.to_string(),
        None => value,
    }
}

impl Display for RelativePath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.value)
    }
}

impl From<&str> for RelativePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Set of file extensions (leading dot included, case-sensitive) excluded from enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    extensions: BTreeSet<String>,
}

impl IgnoreSet {
    /// Resolve the effective ignore set.
    ///
    /// The default image/style filter applies unless `map_images` is set; `extra`
    /// extensions are always added on top. Extensions given without a leading dot
    /// gain one.
    #[must_use]
    pub fn resolve<I, S>(map_images: bool, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let defaults: &[&str] = if map_images {
            &[]
        } else {
            DEFAULT_IGNORED_EXTENSIONS
        };
        let mut extensions: BTreeSet<String> =
            defaults.iter().map(|ext| (*ext).to_string()).collect();
        for ext in extra {
            let ext = ext.as_ref().trim();
            if ext.is_empty() {
                continue;
            }
            if ext.starts_with('.') {
                extensions.insert(ext.to_string());
            } else {
                extensions.insert(format!(".{ext}"));
            }
        }
        Self { extensions }
    }

    /// Returns `true` when the extension (including its leading dot) is ignored.
    #[must_use]
    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    /// Returns `true` when the file name's extension is ignored.
    ///
    /// Names without an extension (including dotfiles such as `.htaccess`) are never ignored.
    #[must_use]
    pub fn ignores(&self, file_name: &Path) -> bool {
        file_name
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.contains(&format!(".{ext}")))
    }

    /// Iterate the ignored extensions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Number of ignored extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns `true` when nothing is ignored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Display for IgnoreSet {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(", ");
        write!(formatter, "[{joined}]")
    }
}
