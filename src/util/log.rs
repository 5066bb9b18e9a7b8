//! Console and run-log subscriber setup.
//!
//! Two layers share one subscriber:
//! - the console on stderr, `info` by default and `debug` with `--verbose`;
//! - the run log file (`config.log`), appended to, timestamped, and always
//!   at `debug` so a failed run can be diagnosed after the fact.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Target for messages that go to the run log only.
///
/// `main` uses it to record the fatal error it already printed itself.
pub const RUN_LOG_TARGET: &str = "run_log";

/// Install the global subscriber.
///
/// With `log_file = None` only the console layer is installed.
pub fn init(verbose: bool, color: bool, log_file: Option<&Path>) -> Result<()> {
    let console_filter = if verbose {
        EnvFilter::new("keelson=debug")
    } else {
        EnvFilter::new("keelson=info")
    };

    let console = fmt::layer()
        .with_target(false)
        .without_time()
        .with_ansi(color)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open run log: {}", path.display()))?;

            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new(format!(
                        "keelson=debug,{}=debug",
                        RUN_LOG_TARGET
                    ))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(())
}
