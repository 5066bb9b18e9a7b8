//! Console status lines and download progress.
//!
//! Diagnostics go through `tracing`; the shell only owns the parts of the
//! console that are not log lines: the aligned status summary printed at
//! the end of a run and the byte progress bars shown while downloading.

use std::fmt::Display;
use std::io::{self, IsTerminal};

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// errors only, no progress
    Quiet,
    /// status messages + progress bars
    #[default]
    Normal,
    /// status messages, no progress bars (the log lines carry progress)
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Found,
    Using,
    Finished,

    // Info statuses (blue)
    Info,

    // Warning statuses (yellow)
    Disabled,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Found => "Found",
            Status::Using => "Using",
            Status::Finished => "Finished",
            Status::Info => "Info",
            Status::Disabled => "Disabled",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Found | Status::Using | Status::Finished => "\x1b[1;32m",
            Status::Info => "\x1b[1;34m",
            Status::Disabled => "\x1b[1;33m",
        }
    }
}

/// Width status labels are right-aligned to.
const STATUS_WIDTH: usize = 12;

/// Console for status summaries and progress bars.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
    interactive: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let interactive = io::stderr().is_terminal();
        let use_color = match color {
            ColorChoice::Auto => interactive,
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
            interactive,
        }
    }

    /// A shell that prints nothing and never draws progress.
    pub fn silent() -> Self {
        Shell {
            verbosity: Verbosity::Quiet,
            use_color: false,
            interactive: false,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message as `{status:>12} {message}`.
    ///
    /// Nothing is printed in quiet mode; errors go through the log.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() {
            return;
        }

        eprintln!("{} {}", self.format_status(status), msg);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();

        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Progress bar for a byte transfer.
    ///
    /// `total` is the declared length; unknown lengths get a spinner.
    /// Hidden unless stderr is a terminal in normal verbosity.
    pub fn bytes_progress(&self, msg: impl Display, total: Option<u64>) -> Progress {
        if self.verbosity != Verbosity::Normal || !self.interactive {
            return Progress { pb: None };
        }

        let pb = match total {
            Some(total) => {
                let pb = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                {
                    pb.set_style(style.progress_chars("#>-"));
                }
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} {bytes}") {
                    pb.set_style(style);
                }
                pb
            }
        };
        pb.set_message(msg.to_string());

        Progress { pb: Some(pb) }
    }
}

/// Progress bar wrapper; a no-op when the shell hides progress.
#[derive(Debug)]
pub struct Progress {
    pb: Option<ProgressBar>,
}

impl Progress {
    pub fn set_position(&self, pos: u64) {
        if let Some(pb) = &self.pb {
            pb.set_position(pos);
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.pb.is_some()
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish();
    }
}
