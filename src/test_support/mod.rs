//! Test utilities and mocks for Keelson unit tests.
//!
//! This module provides stand-ins for the collaborators the pipeline is
//! handed: a scripted command runner, an in-memory fetcher and a reporter
//! that remembers what it was told.
//!
//! # Example
//!
//! ```rust,ignore
//! use keelson::test_support::{MockRunner, RecordingReporter};
//!
//! #[test]
//! fn test_example() {
//!     let runner = MockRunner::new();
//!     runner.expect_exact("cc -dumpversion", CommandOutput::ok("4.4.5\n"));
//!
//!     // Hand `&runner` to the code under test...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Result};
use url::Url;

use crate::sources::fetch::Fetch;
use crate::util::process::{CommandOutput, CommandRunner, ProcessBuilder};
use crate::util::reporter::Reporter;

// Re-export fixtures for convenience
pub use fixtures::*;

impl CommandOutput {
    /// Exit 0 with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        CommandOutput {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Non-zero exit with the given stderr.
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        CommandOutput {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Exit with `status` and no output.
    pub fn exited(status: i32) -> Self {
        CommandOutput {
            status: Some(status),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Pattern for matching commands in MockRunner.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match of the full command line.
    Exact(String),
    /// Command line starts with this prefix.
    StartsWith(String),
    /// Command line ends with this suffix.
    EndsWith(String),
    /// Command line contains this substring.
    Contains(String),
    /// Regex match on the command line.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if a command line matches this pattern.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::EndsWith(s) => cmd.ends_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

#[derive(Debug, Default)]
struct RunnerState {
    expectations: Vec<(CommandPattern, CommandOutput)>,
    calls: Vec<String>,
    default_output: Option<CommandOutput>,
}

/// Command runner that answers from a script instead of spawning.
///
/// Expectations are checked in the order they were added; the first one
/// whose pattern matches the command line answers. Scripts run directly.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<RunnerState>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Add an expectation.
    pub fn expect(&self, pattern: CommandPattern, output: CommandOutput) -> &Self {
        self.lock().expectations.push((pattern, output));
        self
    }

    pub fn expect_exact(&self, cmd: &str, output: CommandOutput) -> &Self {
        self.expect(CommandPattern::Exact(cmd.to_string()), output)
    }

    pub fn expect_prefix(&self, prefix: &str, output: CommandOutput) -> &Self {
        self.expect(CommandPattern::StartsWith(prefix.to_string()), output)
    }

    pub fn expect_suffix(&self, suffix: &str, output: CommandOutput) -> &Self {
        self.expect(CommandPattern::EndsWith(suffix.to_string()), output)
    }

    /// Output for commands that match no expectation.
    pub fn set_default(&self, output: CommandOutput) -> &Self {
        self.lock().default_output = Some(output);
        self
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput> {
        let line = cmd.display_command();
        let mut state = self.lock();
        state.calls.push(line.clone());

        if let Some((_, output)) = state
            .expectations
            .iter()
            .find(|(pattern, _)| pattern.matches(&line))
        {
            return Ok(output.clone());
        }

        match &state.default_output {
            Some(output) => Ok(output.clone()),
            None => bail!("unexpected command: {}", line),
        }
    }

    fn script(&self, script: &Path) -> ProcessBuilder {
        ProcessBuilder::new(script)
    }
}

/// In-memory fetcher: served URLs get their body, everything else is a 404.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        FakeFetcher::default()
    }

    /// Serve `body` at `url`.
    pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) -> &Self {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.into());
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetch for FakeFetcher {
    fn fetch(&self, url: &Url, dest: &Path, reporter: &dyn Reporter) -> bool {
        self.requests.lock().unwrap().push(url.to_string());

        let bodies = self.bodies.lock().unwrap();
        let Some(body) = bodies.get(url.as_str()) else {
            reporter.debug(&format!("{} not found", url));
            return false;
        };

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(dest, body).unwrap();
        true
    }
}

/// Reporter that keeps every message with its level.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        RecordingReporter::default()
    }

    /// Messages logged at `level` ("debug", "info", "warn", "error").
    pub fn messages_at(&self, level: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages_at("warn")
    }

    fn push(&self, level: &'static str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

impl Reporter for RecordingReporter {
    fn debug(&self, message: &str) {
        self.push("debug", message);
    }

    fn info(&self, message: &str) {
        self.push("info", message);
    }

    fn warn(&self, message: &str) {
        self.push("warn", message);
    }

    fn error(&self, message: &str) {
        self.push("error", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_patterns() {
        assert!(CommandPattern::Exact("cc -v".into()).matches("cc -v"));
        assert!(!CommandPattern::Exact("cc -v".into()).matches("cc -v -x"));
        assert!(CommandPattern::StartsWith("cc ".into()).matches("cc -o a a.c"));
        assert!(CommandPattern::EndsWith("--version".into()).matches("/bin/llvm-config --version"));
        assert!(CommandPattern::Contains("-fno".into()).matches("cc -fno-rtti"));
        assert!(CommandPattern::Regex(r"probe\d$".into()).matches("/tmp/probe1"));
        assert!(CommandPattern::Any.matches("anything"));
    }

    #[test]
    fn test_mock_runner_first_match_wins() {
        let runner = MockRunner::new();
        runner.expect_prefix("cc", CommandOutput::ok("first"));
        runner.expect(CommandPattern::Any, CommandOutput::ok("second"));

        let out = runner.run(&ProcessBuilder::new("cc").arg("-v")).unwrap();
        assert_eq!(out.stdout, "first");
        let out = runner.run(&ProcessBuilder::new("ld")).unwrap();
        assert_eq!(out.stdout, "second");
        assert_eq!(runner.calls(), vec!["cc -v", "ld"]);
    }

    #[test]
    fn test_mock_runner_rejects_unexpected() {
        let runner = MockRunner::new();
        assert!(runner.run(&ProcessBuilder::new("cc")).is_err());

        runner.set_default(CommandOutput::exited(3));
        assert_eq!(runner.run(&ProcessBuilder::new("cc")).unwrap().status, Some(3));
    }

    #[test]
    fn test_fake_fetcher() {
        let tmp = tempfile::TempDir::new().unwrap();
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://m.test/a.tar.gz", b"data".to_vec());
        let reporter = RecordingReporter::new();

        let hit = Url::parse("https://m.test/a.tar.gz").unwrap();
        let miss = Url::parse("https://m.test/b.tar.gz").unwrap();
        assert!(fetcher.fetch(&hit, &tmp.path().join("x/a.tar.gz"), &reporter));
        assert!(!fetcher.fetch(&miss, &tmp.path().join("b.tar.gz"), &reporter));

        assert_eq!(std::fs::read(tmp.path().join("x/a.tar.gz")).unwrap(), b"data");
        assert!(!tmp.path().join("b.tar.gz").exists());
        assert_eq!(fetcher.requests().len(), 2);
    }
}
