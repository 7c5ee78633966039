//! HTTP client construction and CLI error types.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use pathmap_fsops::FsOpsError;
use pathmap_probe::ProbeError;
use reqwest::Client;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("pathmap/", env!("CARGO_PKG_VERSION"));

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ProbeError> for CliError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::FetchStatus { url, status } => {
                Self::failure(anyhow!("failed to download template from {url}: HTTP {status}"))
            }
            ProbeError::FsOps {
                source: FsOpsError::ExtractionRoot { path, entries },
                ..
            } => Self::failure(anyhow!(
                "extraction into {} did not produce a single root (new entries: {})",
                path.display(),
                if entries.is_empty() {
                    "none".to_string()
                } else {
                    entries.join(", ")
                }
            )),
            ProbeError::InvalidInput {
                field,
                reason,
                value,
            } => Self::validation(match value {
                Some(value) => format!("invalid {field} ({reason}): {value}"),
                None => format!("invalid {field} ({reason})"),
            }),
            other => Self::failure(anyhow::Error::new(other).context("template mapping failed")),
        }
    }
}

/// Build the shared HTTP client used for the archive download and every probe.
pub(crate) fn build_client(timeout_secs: u64) -> CliResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn exit_codes_split_validation_from_failure() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
        assert_eq!(CliError::validation("bad").display_message(), "bad");
    }

    #[test]
    fn failure_message_includes_context_chain() {
        let err = CliError::failure(anyhow!("inner").context("outer"));
        assert_eq!(err.display_message(), "outer: inner");
    }

    #[test]
    fn fetch_status_maps_to_failure_with_status() {
        let err = CliError::from(ProbeError::FetchStatus {
            url: "http://example.test/cms.zip".into(),
            status: 404,
        });
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.display_message(),
            "failed to download template from http://example.test/cms.zip: HTTP 404"
        );
    }

    #[test]
    fn extraction_root_lists_entries() {
        let err = CliError::from(ProbeError::FsOps {
            operation: "materialize.extract",
            source: FsOpsError::ExtractionRoot {
                path: PathBuf::from("/tmp/templates"),
                entries: vec!["a.php".into(), "b.php".into()],
            },
        });
        assert!(err.display_message().contains("a.php, b.php"));
    }

    #[test]
    fn invalid_input_maps_to_validation() {
        let err = CliError::from(ProbeError::InvalidInput {
            field: "local",
            reason: "not_a_directory",
            value: Some("/missing".into()),
        });
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.display_message(),
            "invalid local (not_a_directory): /missing"
        );
    }

    #[test]
    fn client_builds_with_timeout() {
        assert!(build_client(DEFAULT_TIMEOUT_SECS).is_ok());
    }
}
