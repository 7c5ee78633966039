//! Per-target pass/fail report and its JSON persistence.
//!
//! # Design
//! - Keys are kept in `BTreeMap`s so the serialised document is sorted without a post-pass.
//! - A path lives in at most one bucket per target; a later outcome for the same
//!   path replaces the earlier one.
//! - The report file is written atomically: a temp file in the destination
//!   directory is persisted over the final path.
//! - An overwritten report keeps its mode; a new one is created `0644` on unix.

use std::collections::BTreeMap;
use std::fs::{self, Permissions};
use std::io::Write;
use std::path::Path;

use pathmap_fsops::RelativePath;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{ProbeError, ProbeResult};
use crate::outcome::ProbeOutcome;
use crate::queue::ResultQueue;

#[cfg(unix)]
const NEW_REPORT_MODE: u32 = 0o644;

/// Outcomes for a single target, split by the success flag.
///
/// Fields are declared in key order so the document stays sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    /// Paths that answered anything else, including transport failures (`0`).
    pub fail: BTreeMap<RelativePath, u16>,
    /// Paths that answered `200`.
    pub pass: BTreeMap<RelativePath, u16>,
}

impl TargetReport {
    /// Number of distinct paths recorded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.pass.len() + self.fail.len()
    }
}

/// Mapping from target label to its [`TargetReport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Report {
    targets: BTreeMap<String, TargetReport>,
}

impl Report {
    /// Empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report with an empty section for every target, so targets without
    /// outcomes still appear in the output.
    #[must_use]
    pub fn with_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets
                .into_iter()
                .map(|target| (target.into(), TargetReport::default()))
                .collect(),
        }
    }

    /// Route one outcome into the bucket selected by its success flag.
    pub fn record(&mut self, outcome: ProbeOutcome) {
        let success = outcome.success();
        let (target, path, status) = outcome.into_parts();
        let section = self.targets.entry(target).or_default();
        if success {
            section.fail.remove(&path);
            section.pass.insert(path, status);
        } else {
            section.pass.remove(&path);
            section.fail.insert(path, status);
        }
    }

    /// Drain `results` into the report, returning the number of outcomes folded in.
    ///
    /// Draining an empty queue leaves the report unchanged.
    pub fn aggregate(&mut self, results: &ResultQueue) -> usize {
        let outcomes = results.drain();
        let count = outcomes.len();
        for outcome in outcomes {
            self.record(outcome);
        }
        debug!(outcomes = count, targets = self.targets.len(), "results aggregated");
        count
    }

    /// Section for `target`, if any outcome or placeholder exists for it.
    #[must_use]
    pub fn target(&self, target: &str) -> Option<&TargetReport> {
        self.targets.get(target)
    }

    /// Iterate sections in target order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TargetReport)> {
        self.targets
            .iter()
            .map(|(target, section)| (target.as_str(), section))
    }

    /// Number of targets in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns `true` when no target has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Serialise as pretty JSON with sorted keys and two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Json`] if serialisation fails.
    pub fn to_json(&self) -> ProbeResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| ProbeError::Json {
            operation: "report.serialize",
            source,
        })
    }

    /// Atomically write the JSON document to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Json`] or [`ProbeError::Io`] when the document cannot
    /// be produced or persisted.
    pub fn write_to(&self, path: &Path) -> ProbeResult<()> {
        let document = self.to_json()?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(parent)
            .map_err(|source| ProbeError::io("report.stage", parent, source))?;
        staged
            .write_all(document.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|source| ProbeError::io("report.write", staged.path(), source))?;
        let permissions = match fs::metadata(path) {
            Ok(metadata) => metadata.permissions(),
            Err(_) => new_report_permissions(&staged)?,
        };
        staged
            .as_file()
            .set_permissions(permissions)
            .map_err(|source| ProbeError::io("report.permissions", staged.path(), source))?;
        staged
            .persist(path)
            .map_err(|err| ProbeError::io("report.persist", path, err.error))?;

        info!(path = %path.display(), targets = self.len(), "report written");
        Ok(())
    }
}

fn new_report_permissions(staged: &NamedTempFile) -> ProbeResult<Permissions> {
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut permissions = staged
        .as_file()
        .metadata()
        .map_err(|source| ProbeError::io("report.permissions", staged.path(), source))?
        .permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(NEW_REPORT_MODE);
    }
    Ok(permissions)
}
