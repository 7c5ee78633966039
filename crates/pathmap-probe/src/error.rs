//! # Design
//!
//! - Centralize engine errors for source resolution, probing and reporting.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.
//! - Per-probe transport failures are outcomes, not errors.

use std::io;
use std::path::PathBuf;

use pathmap_fsops::FsOpsError;
use thiserror::Error;

/// Result alias for engine operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Engine-level error type.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// HTTP client operations failed.
    #[error("http operation failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// URL used for the request.
        url: String,
        /// Source HTTP client error.
        source: reqwest::Error,
    },
    /// Downloading the template archive returned a non-200 status.
    #[error("template download returned an unexpected status")]
    FetchStatus {
        /// URL used for the request.
        url: String,
        /// HTTP status code returned by the server.
        status: u16,
    },
    /// Extraction or enumeration of the template failed.
    #[error("template filesystem operation failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: FsOpsError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
    /// Report serialisation failed.
    #[error("report serialisation failed")]
    Json {
        /// Operation identifier.
        operation: &'static str,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// A target base URL was rejected.
    #[error("invalid target")]
    InvalidTarget {
        /// Target as supplied by the caller.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Run inputs were invalid.
    #[error("invalid input")]
    InvalidInput {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
    /// A spawned worker or blocking task failed to complete.
    #[error("worker task failed")]
    WorkerJoin {
        /// Operation identifier.
        operation: &'static str,
        /// Source join error.
        source: tokio::task::JoinError,
    },
}

impl ProbeError {
    pub(crate) fn http(operation: &'static str, url: impl ToString, source: reqwest::Error) -> Self {
        Self::Http {
            operation,
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: Some(path.into()),
            source,
        }
    }

    pub(crate) const fn fsops(operation: &'static str, source: FsOpsError) -> Self {
        Self::FsOps { operation, source }
    }

    pub(crate) const fn join(operation: &'static str, source: tokio::task::JoinError) -> Self {
        Self::WorkerJoin { operation, source }
    }
}
