//! Run orchestration: resolve the template once, probe every target in turn,
//! aggregate once.
//!
//! # Design
//! - All run state lives in [`RunContext`]; nothing is process-global.
//! - Targets are processed sequentially; each round re-walks the template,
//!   refills the probe queue and joins its workers before the next round starts.
//! - A scratch template directory lives as long as the run and is removed on drop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pathmap_fsops::{IgnoreSet, enumerate_paths};
use reqwest::{Client, Url};
use tempfile::TempDir;
use tracing::info;

use crate::console::Console;
use crate::error::{ProbeError, ProbeResult};
use crate::materialize::materialize;
use crate::outcome::Target;
use crate::queue::{ProbeQueue, ResultQueue};
use crate::report::Report;
use crate::worker::run_workers;

/// Default number of concurrent probe workers per target.
pub const DEFAULT_MAX_THREADS: usize = 2;

/// Where the software template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// An existing directory used directly as the source root.
    Local(PathBuf),
    /// An archive URL to download and extract.
    Remote(Url),
}

/// Validated inputs for a single run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Targets to probe, in order.
    pub targets: Vec<Target>,
    /// Template source.
    pub source: SourceSpec,
    /// Extensions excluded from enumeration.
    pub ignore: IgnoreSet,
    /// Concurrent workers per target; must be at least one.
    pub max_threads: usize,
    /// Keep the downloaded archive under `template_dir` instead of a scratch directory.
    pub retain_archive: bool,
    /// Directory used for retained archives.
    pub template_dir: PathBuf,
    /// Enumerate without issuing probes.
    pub dry_run: bool,
}

/// Source root resolved for a run, with the scratch directory that backs it (if any).
#[derive(Debug)]
struct SourceRoot {
    path: PathBuf,
    _scratch: Option<TempDir>,
}

/// Explicit run context shared by the orchestrator's stages.
pub struct RunContext {
    config: RunConfig,
    client: Client,
    console: Arc<dyn Console>,
    paths: Arc<ProbeQueue>,
    results: Arc<ResultQueue>,
}

impl RunContext {
    /// Build a context with empty queues.
    #[must_use]
    pub fn new(config: RunConfig, client: Client, console: Arc<dyn Console>) -> Self {
        Self {
            config,
            client,
            console,
            paths: Arc::new(ProbeQueue::new()),
            results: Arc::new(ResultQueue::new()),
        }
    }

    /// Configuration the run was built with.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run and return the aggregated report.
    ///
    /// The report holds a section for every target. In dry-run mode no probe is
    /// issued and every section is empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot be resolved, the template cannot be
    /// walked, or a worker task fails. Per-probe network failures are recorded as
    /// outcomes instead.
    pub async fn run(&self) -> ProbeResult<Report> {
        if self.config.targets.is_empty() {
            return Err(ProbeError::InvalidInput {
                field: "target",
                reason: "required",
                value: None,
            });
        }

        self.console.info("Preparing local template");
        let source = self.resolve_source().await?;

        for target in &self.config.targets {
            self.probe_target(target, &source.path).await?;
        }

        self.console.info("Collecting results...");
        let mut report = Report::with_targets(self.config.targets.iter().map(Target::label));
        let gathered = report.aggregate(&self.results);
        self.console.debug(&format!("Gathered {gathered} results"));
        info!(targets = report.len(), results = gathered, "run complete");
        Ok(report)
    }

    async fn probe_target(&self, target: &Target, root: &Path) -> ProbeResult<()> {
        let queued = self.refill_queue(root).await?;
        info!(target = %target, queued, "probe round starting");

        if self.config.dry_run {
            self.console
                .debug(&format!("Dry run: skipping {queued} probes against {target}"));
            self.paths.drain();
            return Ok(());
        }

        self.console.debug(&format!(
            "Starting {} workers against {target}",
            self.config.max_threads
        ));
        run_workers(
            self.config.max_threads,
            target,
            Arc::clone(&self.paths),
            Arc::clone(&self.results),
            &self.client,
            Arc::clone(&self.console),
        )
        .await?;
        Ok(())
    }

    async fn refill_queue(&self, root: &Path) -> ProbeResult<usize> {
        self.console
            .debug(&format!("Walking local path: {}", root.display()));
        let walk_root = root.to_path_buf();
        let ignore = self.config.ignore.clone();
        let enumeration =
            tokio::task::spawn_blocking(move || enumerate_paths(&walk_root, &ignore))
                .await
                .map_err(|source| ProbeError::join("orchestrator.enumerate", source))?
                .map_err(|source| ProbeError::fsops("orchestrator.enumerate", source))?;
        self.console.debug(&format!(
            "Found {} files in software template",
            enumeration.files_seen
        ));

        let queued = enumeration.paths.len();
        self.paths.drain();
        self.paths.extend(enumeration.paths);
        Ok(queued)
    }

    async fn resolve_source(&self) -> ProbeResult<SourceRoot> {
        match &self.config.source {
            SourceSpec::Local(path) => {
                let is_dir = tokio::fs::metadata(path)
                    .await
                    .map(|meta| meta.is_dir())
                    .unwrap_or(false);
                if !is_dir {
                    return Err(ProbeError::InvalidInput {
                        field: "local",
                        reason: "not_a_directory",
                        value: Some(path.display().to_string()),
                    });
                }
                Ok(SourceRoot {
                    path: path.clone(),
                    _scratch: None,
                })
            }
            SourceSpec::Remote(url) => {
                self.console.debug(&format!("Pulling source from {url}"));
                let (base_dir, scratch) = if self.config.retain_archive {
                    (self.config.template_dir.clone(), None)
                } else {
                    let scratch = TempDir::new()
                        .map_err(|source| ProbeError::Io {
                            operation: "orchestrator.scratch_dir",
                            path: None,
                            source,
                        })?;
                    (scratch.path().to_path_buf(), Some(scratch))
                };
                let root = materialize(&self.client, url, &base_dir).await?;
                self.console
                    .debug(&format!("Extracted template to {}", root.display()));
                Ok(SourceRoot {
                    path: root,
                    _scratch: scratch,
                })
            }
        }
    }
}
