#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Concurrent path-verification engine.
//!
//! A template (local directory or downloaded archive) is flattened into relative
//! paths, each path is probed against every target by a bounded worker pool, and
//! the outcomes are folded into a per-target pass/fail [`Report`].
//!
//! Layout: `materialize.rs` (download + single-root extraction), `queue.rs`
//! (shared FIFO queues), `outcome.rs` (targets, status bands, outcomes),
//! `worker.rs` (probe pool), `report.rs` (aggregation + persistence),
//! `orchestrator.rs` (run sequencing), `console.rs` (injected progress sink).

pub mod console;
pub mod error;
pub mod materialize;
pub mod orchestrator;
pub mod outcome;
pub mod queue;
pub mod report;
pub mod worker;

pub use console::{Console, TracingConsole};
pub use error::{ProbeError, ProbeResult};
pub use materialize::{TEMPLATE_DIR_NAME, download, materialize};
pub use orchestrator::{DEFAULT_MAX_THREADS, RunConfig, RunContext, SourceSpec};
pub use outcome::{ProbeOutcome, StatusBand, TRANSPORT_FAILURE_STATUS, Target};
pub use queue::{ProbeQueue, ResultQueue, WorkQueue};
pub use report::{Report, TargetReport};
pub use worker::run_workers;
