//! Command-line entrypoint: parse flags, validate them into a run configuration,
//! run the engine and persist the report.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use pathmap_fsops::IgnoreSet;
use pathmap_probe::{
    Console, DEFAULT_MAX_THREADS, RunConfig, RunContext, SourceSpec, TEMPLATE_DIR_NAME, Target,
};
use pathmap_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use reqwest::Url;
use tracing::{debug, info};

use crate::client::{CliError, CliResult, DEFAULT_TIMEOUT_SECS, build_client};
use crate::output::{ColorConsole, print_argument_summary};

#[derive(Debug, Parser)]
#[command(
    name = "pathmap",
    version,
    about = "Map a web application against the file layout of a known software package"
)]
pub(crate) struct Cli {
    #[arg(
        short = 't',
        long = "target",
        required = true,
        num_args = 1..,
        value_parser = parse_target,
        help = "Target base URL(s) to probe"
    )]
    targets: Vec<Target>,
    #[arg(short = 'l', long, help = "Local directory to use as the software template")]
    local: Option<PathBuf>,
    #[arg(
        short = 'r',
        long,
        value_parser = parse_url,
        help = "URL of a .zip/.tar/.tar.gz/.tar.bz archive to use as the template"
    )]
    remote: Option<Url>,
    #[arg(
        long,
        num_args = 1..,
        help = "Extra file extensions to ignore (default = .jpg, .css, .png, .gif)"
    )]
    ignore: Vec<String>,
    #[arg(long, help = "Disable the default image/style filter")]
    map_images: bool,
    #[arg(short = 'o', long, help = "Output file (default = <epoch timestamp>.json)")]
    outfile: Option<PathBuf>,
    #[arg(
        short = 'm',
        long,
        env = "PATHMAP_MAX_THREADS",
        default_value_t = DEFAULT_MAX_THREADS,
        value_parser = parse_thread_count,
        help = "Concurrent probe workers per target"
    )]
    max_threads: usize,
    #[arg(long, help = "Keep the downloaded template (in ./.path_templates)")]
    save: bool,
    #[arg(short = 'q', long, conflicts_with = "verbose", help = "Suppress non-essential output")]
    quiet: bool,
    #[arg(short = 'v', long, help = "Enable verbose output")]
    verbose: bool,
    #[arg(short = 'C', long, help = "Suppress colours in output")]
    nocolor: bool,
    #[arg(long, help = "Show redirect and failed probes as well as successes")]
    showall: bool,
    #[arg(long, help = "Prepare and enumerate the template only; no target is probed")]
    dryrun: bool,
    #[arg(
        long,
        env = "PATHMAP_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = parse_timeout_secs,
        help = "Per-request HTTP timeout in seconds"
    )]
    timeout: u64,
    #[arg(long, env = "PATHMAP_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[arg(long, env = "PATHMAP_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

/// Validated run plus the output location.
#[derive(Debug)]
struct RunSettings {
    config: RunConfig,
    outfile: PathBuf,
}

/// Parses process arguments, runs the mapping and returns the process exit code.
pub async fn run() -> i32 {
    run_from(std::env::args_os()).await
}

/// Same as [`run`] with explicit arguments (the first item is the program name).
pub async fn run_from<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { 2 } else { 0 };
        }
    };

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
    };
    // A subscriber may already be installed when embedded; keep it.
    if init_logging(&logging).is_err() {
        debug!("tracing subscriber already installed");
    }

    let console = Arc::new(ColorConsole::new(
        cli.verbose,
        cli.quiet,
        !cli.nocolor,
        cli.showall,
    ));

    let result = tokio::select! {
        result = execute(cli, Arc::clone(&console)) => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            info!("interrupted; exiting without writing a report");
            return 0;
        }
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            console.error(&err.display_message());
            err.exit_code()
        }
    }
}

async fn execute(cli: Cli, console: Arc<ColorConsole>) -> CliResult<()> {
    let settings = build_run_config(&cli, console.as_ref())?;
    print_argument_summary(console.as_ref(), &summary_rows(&cli, &settings));

    let client = build_client(cli.timeout)?;
    let context = RunContext::new(settings.config, client, console.clone());
    let report = context.run().await?;

    if context.config().dry_run {
        console.info("Dry run complete; no report written");
        return Ok(());
    }

    let outfile = settings.outfile;
    tokio::task::spawn_blocking({
        let outfile = outfile.clone();
        move || report.write_to(&outfile)
    })
    .await
    .map_err(CliError::failure)??;
    console.info(&format!("Wrote {}", outfile.display()));
    Ok(())
}

fn build_run_config(cli: &Cli, console: &dyn Console) -> CliResult<RunSettings> {
    let source = match (&cli.local, &cli.remote) {
        (None, None) => return Err(CliError::validation("--local or --remote source required")),
        (Some(local), remote) => {
            if remote.is_some() {
                console.info("--local and --remote passed, using --local");
            }
            if !local.is_dir() {
                return Err(CliError::validation(format!(
                    "local source {} does not exist or is not a directory",
                    local.display()
                )));
            }
            SourceSpec::Local(local.clone())
        }
        (None, Some(remote)) => SourceSpec::Remote(remote.clone()),
    };

    let outfile = cli.outfile.clone().unwrap_or_else(default_outfile);
    ensure_writable(&outfile).map_err(|err| {
        CliError::validation(format!("error accessing {}: {err}", outfile.display()))
    })?;

    Ok(RunSettings {
        config: RunConfig {
            targets: cli.targets.clone(),
            source,
            ignore: IgnoreSet::resolve(cli.map_images, &cli.ignore),
            max_threads: cli.max_threads,
            retain_archive: cli.save,
            template_dir: PathBuf::from(TEMPLATE_DIR_NAME),
            dry_run: cli.dryrun,
        },
        outfile,
    })
}

fn summary_rows(cli: &Cli, settings: &RunSettings) -> Vec<(&'static str, String)> {
    let targets: Vec<&str> = cli.targets.iter().map(Target::label).collect();
    let optional = |value: Option<String>| value.unwrap_or_else(|| "None".to_string());
    vec![
        ("Target(s)", targets.join(", ")),
        (
            "Source",
            optional(cli.local.as_ref().map(|path| path.display().to_string())),
        ),
        ("Remote", optional(cli.remote.as_ref().map(Url::to_string))),
        ("Outfile", settings.outfile.display().to_string()),
        ("Filtering", settings.config.ignore.to_string()),
        ("Max Threads", cli.max_threads.to_string()),
        ("Verbose", cli.verbose.to_string()),
        ("Save", cli.save.to_string()),
        ("Show All", cli.showall.to_string()),
        ("Include Images", cli.map_images.to_string()),
        ("No Color", cli.nocolor.to_string()),
        ("Dry Run", cli.dryrun.to_string()),
    ]
}

fn default_outfile() -> PathBuf {
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    PathBuf::from(format!("{epoch}.json"))
}

/// Probe that `path` can be written without truncating it or leaving a new file behind.
fn ensure_writable(path: &Path) -> io::Result<()> {
    if path.exists() {
        OpenOptions::new().write(true).open(path).map(drop)
    } else {
        OpenOptions::new().write(true).create_new(true).open(path)?;
        fs::remove_file(path)
    }
}

fn parse_target(input: &str) -> Result<Target, String> {
    Target::parse(input).map_err(|err| match err {
        pathmap_probe::ProbeError::InvalidTarget { reason, .. } => {
            format!("invalid target '{input}': {reason}")
        }
        other => format!("invalid target '{input}': {other}"),
    })
}

fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

fn parse_thread_count(input: &str) -> Result<usize, String> {
    match input.trim().parse::<usize>() {
        Ok(0) => Err("max threads must be at least 1".to_string()),
        Ok(count) => Ok(count),
        Err(err) => Err(format!("invalid thread count '{input}': {err}")),
    }
}

fn parse_timeout_secs(input: &str) -> Result<u64, String> {
    match input.trim().parse::<u64>() {
        Ok(0) => Err("timeout must be at least 1 second".to_string()),
        Ok(secs) => Ok(secs),
        Err(err) => Err(format!("invalid timeout '{input}': {err}")),
    }
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pathmap_test_support::fixtures::write_tree;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Result<Cli> {
        let mut argv = vec!["pathmap"];
        argv.extend_from_slice(args);
        Ok(Cli::try_parse_from(argv)?)
    }

    fn quiet_console() -> ColorConsole {
        ColorConsole::new(false, true, false, false)
    }

    #[test]
    fn parse_url_rejects_invalid_input() {
        let err = parse_url("not-a-url").expect_err("invalid URL should fail");
        assert!(err.contains("invalid URL"));
    }

    #[test]
    fn parse_target_requires_http_scheme() {
        let err = parse_target("ftp://example.test").expect_err("ftp target should fail");
        assert!(err.contains("unsupported_scheme"));
        assert!(parse_target("https://example.test").is_ok());
    }

    #[test]
    fn parse_thread_count_rejects_zero() {
        assert!(parse_thread_count("0").is_err());
        assert!(parse_thread_count("abc").is_err());
        assert_eq!(parse_thread_count("4"), Ok(4));
    }

    #[test]
    fn zero_timeout_is_a_usage_error() -> Result<()> {
        assert!(parse_timeout_secs("0").is_err());
        assert_eq!(parse_timeout_secs("30"), Ok(30));
        let err = Cli::try_parse_from(["pathmap", "-t", "http://a.test", "--timeout", "0"])
            .expect_err("zero timeout should be rejected");
        assert!(err.use_stderr());
        assert_eq!(parse(&["-t", "http://a.test"])?.timeout, DEFAULT_TIMEOUT_SECS);
        Ok(())
    }

    #[test]
    fn flags_parse_into_cli() -> Result<()> {
        let cli = parse(&[
            "-t",
            "http://a.test",
            "http://b.test",
            "-l",
            "template",
            "--ignore",
            "php",
            ".txt",
            "--map-images",
            "-m",
            "4",
            "-C",
            "--showall",
            "--dryrun",
            "--save",
        ])?;
        assert_eq!(cli.targets.len(), 2);
        assert_eq!(cli.targets[1].label(), "http://b.test");
        assert_eq!(cli.local, Some(PathBuf::from("template")));
        assert_eq!(cli.ignore, vec!["php".to_string(), ".txt".to_string()]);
        assert!(cli.map_images && cli.nocolor && cli.showall && cli.dryrun && cli.save);
        assert_eq!(cli.max_threads, 4);
        Ok(())
    }

    #[test]
    fn target_is_required_and_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["pathmap", "-l", "x"]).is_err());
        assert!(
            Cli::try_parse_from(["pathmap", "-t", "http://a.test", "-q", "-v"]).is_err()
        );
    }

    #[test]
    fn missing_source_is_validation_error() -> Result<()> {
        let cli = parse(&["-t", "http://a.test"])?;
        let err = build_run_config(&cli, &quiet_console()).expect_err("source required");
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[test]
    fn missing_local_directory_is_validation_error() -> Result<()> {
        let temp = TempDir::new()?;
        let missing = temp.path().join("absent");
        let cli = parse(&["-t", "http://a.test", "-l", &missing.to_string_lossy()])?;
        let err = build_run_config(&cli, &quiet_console()).expect_err("local must exist");
        assert!(matches!(err, CliError::Validation(_)));
        Ok(())
    }

    #[test]
    fn local_wins_over_remote_and_ignore_is_resolved() -> Result<()> {
        let temp = TempDir::new()?;
        write_tree(temp.path(), &[("index.php", "<?php")])?;
        let outfile = temp.path().join("out.json");
        let cli = parse(&[
            "-t",
            "http://a.test",
            "-l",
            &temp.path().to_string_lossy(),
            "-r",
            "http://mirror.test/cms.zip",
            "--ignore",
            "php",
            "-o",
            &outfile.to_string_lossy(),
        ])?;
        let settings =
            build_run_config(&cli, &quiet_console()).map_err(|err| anyhow::anyhow!("{err:?}"))?;

        assert_eq!(
            settings.config.source,
            SourceSpec::Local(temp.path().to_path_buf())
        );
        assert!(settings.config.ignore.contains(".php"));
        assert!(settings.config.ignore.contains(".png"));
        assert_eq!(settings.outfile, outfile);
        assert_eq!(settings.config.max_threads, DEFAULT_MAX_THREADS);
        assert!(!outfile.exists());
        Ok(())
    }

    #[test]
    fn ensure_writable_keeps_existing_contents() -> Result<()> {
        let temp = TempDir::new()?;
        let existing = temp.path().join("keep.json");
        fs::write(&existing, "previous")?;
        ensure_writable(&existing)?;
        assert_eq!(fs::read_to_string(&existing)?, "previous");

        let fresh = temp.path().join("fresh.json");
        ensure_writable(&fresh)?;
        assert!(!fresh.exists());

        assert!(ensure_writable(&temp.path().join("missing/out.json")).is_err());
        Ok(())
    }

    #[test]
    fn default_outfile_is_epoch_json() {
        let name = default_outfile().to_string_lossy().into_owned();
        let stem = name.strip_suffix(".json").expect("json suffix");
        assert!(stem.parse::<u64>().is_ok());
    }

    #[test]
    fn summary_lists_every_option() -> Result<()> {
        let temp = TempDir::new()?;
        let cli = parse(&[
            "-t",
            "http://a.test",
            "-l",
            &temp.path().to_string_lossy(),
            "-o",
            &temp.path().join("out.json").to_string_lossy(),
        ])?;
        let settings =
            build_run_config(&cli, &quiet_console()).map_err(|err| anyhow::anyhow!("{err:?}"))?;
        let rows = summary_rows(&cli, &settings);
        let keys: Vec<&str> = rows.iter().map(|(key, _)| *key).collect();
        assert_eq!(
            keys,
            vec![
                "Target(s)",
                "Source",
                "Remote",
                "Outfile",
                "Filtering",
                "Max Threads",
                "Verbose",
                "Save",
                "Show All",
                "Include Images",
                "No Color",
                "Dry Run",
            ]
        );
        assert_eq!(rows[2].1, "None");
        assert_eq!(rows[4].1, "[.css, .gif, .jpg, .png]");
        Ok(())
    }
}
