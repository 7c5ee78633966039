//! Coloured console output for the CLI.
//!
//! Progress and probe outcomes go to stdout; errors go to stderr.

use colored::{Color, Colorize};
use pathmap_probe::{Console, ProbeOutcome, StatusBand};
use reqwest::Url;

/// Console honouring the verbose, quiet, no-color and show-all switches.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColorConsole {
    verbose: bool,
    quiet: bool,
    color: bool,
    show_all: bool,
}

impl ColorConsole {
    pub(crate) const fn new(verbose: bool, quiet: bool, color: bool, show_all: bool) -> Self {
        Self {
            verbose,
            quiet,
            color,
            show_all,
        }
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.color {
            return text.to_string();
        }
        let styled = text.color(color);
        if bold {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    }

    /// Successes are shown unless quiet; other bands need `--showall` or `--verbose`.
    pub(crate) const fn shows(&self, band: StatusBand) -> bool {
        if self.quiet {
            return false;
        }
        match band {
            StatusBand::Success => true,
            StatusBand::Redirect | StatusBand::ClientError | StatusBand::Error => {
                self.show_all || self.verbose
            }
        }
    }

    pub(crate) fn render_info(&self, message: &str) -> Option<String> {
        (!self.quiet).then(|| self.paint(&format!("[*] {message}"), Color::Green, true))
    }

    pub(crate) fn render_debug(&self, message: &str) -> Option<String> {
        self.verbose
            .then(|| self.paint(&format!(" -  {message}"), Color::Blue, false))
    }

    pub(crate) fn render_error(&self, message: &str) -> String {
        self.paint(&format!("[*] {message}"), Color::Red, true)
    }

    pub(crate) fn render_outcome(&self, outcome: &ProbeOutcome, url: &Url) -> Option<String> {
        let band = outcome.band();
        self.shows(band).then(|| {
            self.paint(
                &format!("{} [{}] {url}", outcome.status(), band.signature()),
                band_color(band),
                false,
            )
        })
    }
}

const fn band_color(band: StatusBand) -> Color {
    match band {
        StatusBand::Success => Color::Green,
        StatusBand::Redirect => Color::Cyan,
        StatusBand::ClientError => Color::Yellow,
        StatusBand::Error => Color::Red,
    }
}

impl Console for ColorConsole {
    fn info(&self, message: &str) {
        if let Some(line) = self.render_info(message) {
            println!("{line}");
        }
    }

    fn debug(&self, message: &str) {
        if let Some(line) = self.render_debug(message) {
            println!("{line}");
        }
    }

    fn error(&self, message: &str) {
        eprintln!("{}", self.render_error(message));
    }

    fn outcome(&self, outcome: &ProbeOutcome, url: &Url) {
        if let Some(line) = self.render_outcome(outcome, url) {
            println!("{line}");
        }
    }
}

/// Print the `Argument Summary` block at debug level.
pub(crate) fn print_argument_summary(console: &dyn Console, rows: &[(&str, String)]) {
    console.debug("Argument Summary");
    for (key, value) in rows {
        console.debug(&format!("{key:<15}: {value}"));
    }
}
