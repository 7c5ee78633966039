//! Operator-facing progress reporting.
//!
//! The engine only talks to the [`Console`] trait; the CLI provides a coloured
//! implementation and library callers can fall back to [`TracingConsole`].

use reqwest::Url;
use tracing::{debug, error, info};

use crate::outcome::ProbeOutcome;

/// Sink for progress messages and per-probe outcomes.
pub trait Console: Send + Sync {
    /// Informational message shown unless the operator asked for quiet output.
    fn info(&self, message: &str);

    /// Diagnostic message shown only in verbose mode.
    fn debug(&self, message: &str);

    /// Failure message that is always shown.
    fn error(&self, message: &str);

    /// Report one completed probe against `url`.
    fn outcome(&self, outcome: &ProbeOutcome, url: &Url);
}

/// [`Console`] that forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn debug(&self, message: &str) {
        debug!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }

    fn outcome(&self, outcome: &ProbeOutcome, url: &Url) {
        debug!(
            url = %url,
            status = outcome.status(),
            band = outcome.band().as_str(),
            "{} {url}",
            outcome.band().signature()
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Console that records every call for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingConsole {
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl RecordingConsole {
        pub(crate) fn lines(&self) -> Vec<String> {
            self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
        }

        fn record(&self, line: String) {
            if let Ok(mut lines) = self.lines.lock() {
                lines.push(line);
            }
        }
    }

    impl Console for RecordingConsole {
        fn info(&self, message: &str) {
            self.record(format!("info: {message}"));
        }

        fn debug(&self, message: &str) {
            self.record(format!("debug: {message}"));
        }

        fn error(&self, message: &str) {
            self.record(format!("error: {message}"));
        }

        fn outcome(&self, outcome: &ProbeOutcome, url: &Url) {
            self.record(format!("{} {url}", outcome.band().signature()));
        }
    }
}
