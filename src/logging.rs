use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::DeployResult;

/// The run's log file. Everything logged during the run is appended
/// to it, including the captured output of every command.
#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `deploy_YYYYMMDD_HHMMSS.log` for the given start time.
#[must_use]
pub fn file_name(started: &DateTime<Local>) -> String {
    format!("deploy_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Open (append) the log file in `dir`.
///
/// # Errors
///
/// Returns an error if `dir` cannot be created or the file cannot be
/// opened for appending.
pub fn open(dir: &Path, started: &DateTime<Local>) -> DeployResult<(LogSink, File)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name(started));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((LogSink { path }, file))
}

/// Install the global subscriber: terminal output filtered by
/// `RUST_LOG` (default `info`), and the log file at `debug`.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global
/// subscriber is already installed.
pub fn init(dir: &Path) -> DeployResult<LogSink> {
    let (sink, file) = open(dir, &Local::now())?;

    let terminal = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(terminal_filter()?);

    let logfile = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(terminal)
        .with(logfile)
        .try_init()
        .map_err(std::io::Error::other)?;

    tracing::debug!("logging to {}", sink.path.display());
    Ok(sink)
}

/// `RUST_LOG` or `info`, with command output silenced. Command
/// output belongs in the file only.
fn terminal_filter() -> DeployResult<EnvFilter> {
    let quiet_commands: Directive = "shipyard::cmd=off".parse().map_err(std::io::Error::other)?;
    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(quiet_commands))
}
