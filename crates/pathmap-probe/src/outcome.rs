//! Targets, status bands and probe outcomes.
//!
//! # Design
//! - Band boundaries are policy: 200 is success, 300-302 redirect, 400-404 client
//!   error, everything else (including transport failures) error.
//! - `ProbeOutcome` derives its success flag from the status so the two cannot disagree.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use pathmap_fsops::RelativePath;
use reqwest::Url;

use crate::error::{ProbeError, ProbeResult};

/// Status recorded when a probe fails before any HTTP status is received.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// Base URL of a deployed application instance.
///
/// The label is the target exactly as supplied and keys the report; the parsed
/// URL is used to build probe URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    label: String,
    base: Url,
}

impl Target {
    /// Parse a target base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidTarget`] when the value is not an absolute
    /// `http`/`https` URL with a host.
    pub fn parse(value: &str) -> ProbeResult<Self> {
        let label = value.trim();
        let base = Url::parse(label).map_err(|_| ProbeError::InvalidTarget {
            value: value.to_string(),
            reason: "unparseable_url",
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ProbeError::InvalidTarget {
                value: value.to_string(),
                reason: "unsupported_scheme",
            });
        }
        if base.host_str().is_none_or(str::is_empty) {
            return Err(ProbeError::InvalidTarget {
                value: value.to_string(),
                reason: "missing_host",
            });
        }
        Ok(Self {
            label: label.to_string(),
            base,
        })
    }

    /// Target as supplied by the caller.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Parsed base URL.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Build the absolute probe URL for `path`, percent-encoding each segment.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidTarget`] if the base URL cannot carry a path.
    pub fn probe_url(&self, path: &RelativePath) -> ProbeResult<Url> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if path.is_escaped() {
            if url.cannot_be_a_base() {
                return Err(ProbeError::InvalidTarget {
                    value: self.label.clone(),
                    reason: "cannot_be_base",
                });
            }
            let joined = format!("{}/{path}", url.path().trim_end_matches('/'));
            url.set_path(&joined);
            return Ok(url);
        }
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ProbeError::InvalidTarget {
                    value: self.label.clone(),
                    reason: "cannot_be_base",
                })?;
            segments.pop_if_empty();
            segments.extend(path.segments());
        }
        Ok(url)
    }
}

impl FromStr for Target {
    type Err = ProbeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Display for Target {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.label)
    }
}

/// Classification bucket for a probe's HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusBand {
    /// Exactly `200`.
    Success,
    /// `300` through `302`.
    Redirect,
    /// `400` through `404`.
    ClientError,
    /// Any other status, including transport failures.
    Error,
}

impl StatusBand {
    /// Classify a status code.
    #[must_use]
    pub const fn classify(status: u16) -> Self {
        match status {
            200 => Self::Success,
            300..=302 => Self::Redirect,
            400..=404 => Self::ClientError,
            _ => Self::Error,
        }
    }

    /// Console signature for the band.
    #[must_use]
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Success => "==>",
            Self::Redirect => "<_>",
            Self::ClientError => "_!_",
            Self::Error => "_X_",
        }
    }

    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Redirect => "redirect",
            Self::ClientError => "client_error",
            Self::Error => "error",
        }
    }
}

/// Result of probing one relative path against one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    target: String,
    path: RelativePath,
    status: u16,
}

impl ProbeOutcome {
    /// Record a probe that returned `status`.
    #[must_use]
    pub fn new(target: impl Into<String>, path: RelativePath, status: u16) -> Self {
        Self {
            target: target.into(),
            path,
            status,
        }
    }

    /// Record a probe that failed before a status was received.
    #[must_use]
    pub fn transport_failure(target: impl Into<String>, path: RelativePath) -> Self {
        Self::new(target, path, TRANSPORT_FAILURE_STATUS)
    }

    /// Target label the probe was issued against.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Relative path that was probed.
    #[must_use]
    pub const fn path(&self) -> &RelativePath {
        &self.path
    }

    /// HTTP status, or [`TRANSPORT_FAILURE_STATUS`].
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// `true` iff the status is `200`.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.status == 200
    }

    /// Band the status falls into.
    #[must_use]
    pub const fn band(&self) -> StatusBand {
        StatusBand::classify(self.status)
    }

    /// Split into `(target, path, status)`.
    #[must_use]
    pub fn into_parts(self) -> (String, RelativePath, u16) {
        (self.target, self.path, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries_are_exact() {
        assert_eq!(StatusBand::classify(200), StatusBand::Success);
        assert_eq!(StatusBand::classify(201), StatusBand::Error);
        assert_eq!(StatusBand::classify(299), StatusBand::Error);
        assert_eq!(StatusBand::classify(300), StatusBand::Redirect);
        assert_eq!(StatusBand::classify(302), StatusBand::Redirect);
        assert_eq!(StatusBand::classify(303), StatusBand::Error);
        assert_eq!(StatusBand::classify(307), StatusBand::Error);
        assert_eq!(StatusBand::classify(400), StatusBand::ClientError);
        assert_eq!(StatusBand::classify(404), StatusBand::ClientError);
        assert_eq!(StatusBand::classify(405), StatusBand::Error);
        assert_eq!(StatusBand::classify(500), StatusBand::Error);
        assert_eq!(
            StatusBand::classify(TRANSPORT_FAILURE_STATUS),
            StatusBand::Error
        );
    }

    #[test]
    fn success_flag_tracks_status() {
        for status in [0, 199, 200, 204, 301, 404, 500] {
            let outcome = ProbeOutcome::new("http://example.test", "a.php".into(), status);
            assert_eq!(outcome.success(), status == 200, "{status}");
        }
    }

    #[test]
    fn not_found_lands_in_client_error_band() {
        let outcome = ProbeOutcome::new("http://example.test", "admin/config.php".into(), 404);
        assert!(!outcome.success());
        assert_eq!(outcome.band(), StatusBand::ClientError);
        assert_eq!(outcome.band().signature(), "_!_");
        assert_eq!(outcome.path().as_str(), "admin/config.php");
    }

    #[test]
    fn target_rejects_non_http_values() {
        assert!(matches!(
            Target::parse("ftp://example.test"),
            Err(ProbeError::InvalidTarget {
                reason: "unsupported_scheme",
                ..
            })
        ));
        assert!(matches!(
            Target::parse("example.test"),
            Err(ProbeError::InvalidTarget {
                reason: "unparseable_url",
                ..
            })
        ));
    }

    #[test]
    fn target_keeps_label_verbatim() -> anyhow::Result<()> {
        let target: Target = "http://example.test".parse()?;
        assert_eq!(target.label(), "http://example.test");
        assert_eq!(target.base().as_str(), "http://example.test/");
        Ok(())
    }

    #[test]
    fn probe_url_joins_and_encodes_segments() -> anyhow::Result<()> {
        let target = Target::parse("http://example.test")?;
        let url = target.probe_url(&"admin/config.php".into())?;
        assert_eq!(url.as_str(), "http://example.test/admin/config.php");

        let odd = target.probe_url(&"docs/read me#1?.txt".into())?;
        assert_eq!(odd.as_str(), "http://example.test/docs/read%20me%231%3F.txt");

        let nested = Target::parse("https://example.test/app/")?;
        let url = nested.probe_url(&"index.php".into())?;
        assert_eq!(url.as_str(), "https://example.test/app/index.php");

        let raw = nested.probe_url(&RelativePath::escaped("my%20docs/caf%E9.php"))?;
        assert_eq!(raw.as_str(), "https://example.test/app/my%20docs/caf%E9.php");
        Ok(())
    }
}
