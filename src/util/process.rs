//! Subprocess execution utilities.
//!
//! Every external program keelson runs (compilers, probe binaries, the
//! toolkit locator, the archive tool) goes through a [`CommandRunner`].
//! The runner is picked once from the host descriptor: POSIX hosts run
//! commands directly, the windows family wraps them through `cmd /C` and
//! runs script helpers through an interpreter.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

use crate::core::host::HostDescriptor;

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Run this command as the arguments of another program.
    ///
    /// `ProcessBuilder::new("cc").arg("-v").wrapped("cmd", ["/C"])` becomes
    /// `cmd /C cc -v`.
    pub fn wrapped<I, S>(&self, program: impl AsRef<Path>, leading: I) -> ProcessBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut wrapped = self.clone();
        wrapped.program = program.as_ref().to_path_buf();
        wrapped.args = leading
            .into_iter()
            .map(|s| s.as_ref().to_string_lossy().into_owned())
            .collect();
        wrapped
            .args
            .push(self.program.to_string_lossy().into_owned());
        wrapped.args.extend(self.args.iter().cloned());
        wrapped
    }

    /// Execute the command and wait for completion.
    ///
    /// stdin is closed; stdout and stderr are captured.
    pub fn exec(&self) -> Result<Output> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run `{}`", self.program.display()))
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// First non-empty line of stdout, trimmed.
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.lines().map(str::trim).find(|l| !l.is_empty())
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Executes commands the way the host platform family needs them run.
///
/// Returning `Err` means the command could not be started at all; a
/// command that ran and failed is an `Ok` with a non-zero status.
pub trait CommandRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput>;

    /// Command that runs the script helper at `script`.
    fn script(&self, script: &Path) -> ProcessBuilder;
}

/// Runs commands directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixRunner;

impl CommandRunner for PosixRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput> {
        tracing::trace!("running `{}`", cmd.display_command());
        cmd.exec().map(CommandOutput::from)
    }

    fn script(&self, script: &Path) -> ProcessBuilder {
        ProcessBuilder::new(script)
    }
}

/// Wraps every command through the native command interpreter.
#[derive(Debug, Clone)]
pub struct WindowsRunner {
    shell: PathBuf,
    interpreter: PathBuf,
}

impl WindowsRunner {
    /// `interpreter` runs script helpers such as the toolkit locator.
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        WindowsRunner {
            shell: PathBuf::from("cmd"),
            interpreter: interpreter.into(),
        }
    }

    fn wrap(&self, cmd: &ProcessBuilder) -> ProcessBuilder {
        cmd.wrapped(&self.shell, ["/C"])
    }
}

impl CommandRunner for WindowsRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput> {
        let wrapped = self.wrap(cmd);
        tracing::trace!("running `{}`", wrapped.display_command());
        wrapped.exec().map(CommandOutput::from)
    }

    fn script(&self, script: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.interpreter).arg(script)
    }
}

/// Pick the runner for the host's platform family.
pub fn runner_for(host: &HostDescriptor, interpreter: &Path) -> Box<dyn CommandRunner> {
    if host.is_windows {
        Box::new(WindowsRunner::new(interpreter))
    } else {
        Box::new(PosixRunner)
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find an executable in an explicit search path instead of PATH.
pub fn find_executable_in(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    which::which_in(name, Some(search_path), cwd).ok()
}

/// Find a C compiler.
pub fn find_c_compiler() -> Option<PathBuf> {
    // Check CC environment variable first
    if let Ok(cc) = std::env::var("CC") {
        if let Some(path) = find_executable(&cc) {
            return Some(path);
        }
    }

    for compiler in &["cc", "gcc", "clang"] {
        if let Some(path) = find_executable(compiler) {
            return Some(path);
        }
    }

    None
}

/// Find a C++ compiler.
pub fn find_cxx_compiler() -> Option<PathBuf> {
    if let Ok(cxx) = std::env::var("CXX") {
        if let Some(path) = find_executable(&cxx) {
            return Some(path);
        }
    }

    for compiler in &["c++", "g++", "clang++"] {
        if let Some(path) = find_executable(compiler) {
            return Some(path);
        }
    }

    None
}
