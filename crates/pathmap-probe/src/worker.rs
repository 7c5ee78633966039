//! Probe worker pool.
//!
//! # Design
//! - Workers pull from a shared [`ProbeQueue`] until it is empty, then exit.
//! - Every probe produces exactly one [`ProbeOutcome`]; transport failures are
//!   recorded with status `0` instead of aborting the run.
//! - The pool is joined explicitly; a panicked worker surfaces as an error.

use std::sync::Arc;

use pathmap_fsops::RelativePath;
use reqwest::Client;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::console::Console;
use crate::error::{ProbeError, ProbeResult};
use crate::outcome::{ProbeOutcome, Target};
use crate::queue::{ProbeQueue, ResultQueue};

/// Spawn `count` workers against `target` and wait until the probe queue is drained.
///
/// Returns the number of outcomes pushed onto `results`.
///
/// # Errors
///
/// Returns [`ProbeError::InvalidInput`] when `count` is zero and
/// [`ProbeError::WorkerJoin`] when a worker task panics.
pub async fn run_workers(
    count: usize,
    target: &Target,
    paths: Arc<ProbeQueue>,
    results: Arc<ResultQueue>,
    client: &Client,
    console: Arc<dyn Console>,
) -> ProbeResult<usize> {
    if count == 0 {
        return Err(ProbeError::InvalidInput {
            field: "max_threads",
            reason: "must_be_positive",
            value: Some(count.to_string()),
        });
    }

    let mut workers = JoinSet::new();
    for worker_id in 0..count {
        let target = target.clone();
        let paths = Arc::clone(&paths);
        let results = Arc::clone(&results);
        let client = client.clone();
        let console = Arc::clone(&console);
        workers.spawn(async move {
            worker_loop(worker_id, &target, &paths, &results, &client, console.as_ref()).await
        });
    }

    let mut processed = 0;
    while let Some(joined) = workers.join_next().await {
        processed += joined.map_err(|source| ProbeError::join("probe.worker", source))?;
    }
    debug!(target = %target, processed, "probe workers finished");
    Ok(processed)
}

async fn worker_loop(
    worker_id: usize,
    target: &Target,
    paths: &ProbeQueue,
    results: &ResultQueue,
    client: &Client,
    console: &dyn Console,
) -> usize {
    let mut processed = 0;
    while let Some(path) = paths.pop() {
        results.push(probe_path(client, target, path, console).await);
        processed += 1;
    }
    debug!(worker_id, processed, "probe worker exiting");
    processed
}

/// Issue one GET for `path` against `target` and record the outcome.
pub(crate) async fn probe_path(
    client: &Client,
    target: &Target,
    path: RelativePath,
    console: &dyn Console,
) -> ProbeOutcome {
    let url = match target.probe_url(&path) {
        Ok(url) => url,
        Err(err) => {
            warn!(error = %err, target = %target, path = %path, "probe url could not be built");
            return ProbeOutcome::transport_failure(target.label(), path);
        }
    };

    let outcome = match client.get(url.clone()).send().await {
        Ok(response) => ProbeOutcome::new(target.label(), path, response.status().as_u16()),
        Err(err) => {
            debug!(error = %err, url = %url, "probe request failed");
            ProbeOutcome::transport_failure(target.label(), path)
        }
    };
    console.outcome(&outcome, &url);
    outcome
}
