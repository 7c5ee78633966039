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

//! Filesystem side of template mapping: archive extraction and path enumeration.
//!
//! Layout: `archive.rs` (single-root extraction), `enumerate.rs` (template walk),
//! `model/` (relative paths and ignore sets), `error.rs` (error taxonomy).

pub mod archive;
pub mod enumerate;
pub mod error;
pub mod model;

pub use archive::{ArchiveKind, extract_archive, extract_single_root};
pub use enumerate::{Enumeration, enumerate_paths};
pub use error::{FsOpsError, FsOpsResult};
pub use model::{DEFAULT_IGNORED_EXTENSIONS, IgnoreSet, RelativePath};
