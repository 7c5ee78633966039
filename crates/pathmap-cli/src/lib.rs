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
#![allow(clippy::redundant_pub_crate)]

//! Command-line front end for mapping a web target against a software template.
//!
//! Layout:
//! - `cli.rs`: argument parsing, validation into a run configuration, dispatch
//! - `client.rs`: HTTP client construction and CLI error types
//! - `output.rs`: coloured console and argument summary
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod output;

pub use cli::{run, run_from};
