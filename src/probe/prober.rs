//! Building and running probe programs.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tempfile::TempDir;

use crate::core::host::HostDescriptor;
use crate::util::process::{CommandOutput, CommandRunner, ProcessBuilder};
use crate::util::reporter::Reporter;

/// Builds probe programs with the host C compiler.
///
/// Every call gets its own scratch directory, removed when the call
/// returns whether or not the compile succeeded.
pub struct Prober<'a> {
    cc: PathBuf,
    cflags: Vec<String>,
    host: &'a HostDescriptor,
    runner: &'a dyn CommandRunner,
    reporter: &'a dyn Reporter,
}

impl<'a> Prober<'a> {
    pub fn new(
        cc: impl Into<PathBuf>,
        host: &'a HostDescriptor,
        runner: &'a dyn CommandRunner,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Prober {
            cc: cc.into(),
            cflags: Vec::new(),
            host,
            runner,
            reporter,
        }
    }

    /// Extra flags for every compile.
    pub fn with_cflags(mut self, cflags: &[String]) -> Self {
        self.cflags = cflags.to_vec();
        self
    }

    /// Build `source` into an executable and run it.
    ///
    /// Returns the program's exit status, or `None` if it did not compile.
    /// A program killed by a signal is an error.
    pub fn compile_and_run(&self, name: &str, source: &str) -> Result<Option<i32>> {
        let scratch = scratch_dir()?;
        let src = write_source(&scratch, name, source)?;
        let exe = scratch.path().join(self.host.exe_name(name));

        let compile = ProcessBuilder::new(&self.cc)
            .args(&self.cflags)
            .arg("-o")
            .arg(&exe)
            .arg(&src);
        if !self.compile(name, source, &compile)? {
            return Ok(None);
        }

        let run = self.runner.run(&ProcessBuilder::new(&exe))?;
        match run.status {
            Some(code) => {
                self.reporter
                    .debug(&format!("probe `{}` exited with {}", name, code));
                Ok(Some(code))
            }
            None => bail!("probe `{}` was terminated by a signal", name),
        }
    }

    /// Compile `source` to assembly on stdout without running anything.
    ///
    /// True when the compile succeeds and, if given, `marker` appears in
    /// the generated assembly.
    pub fn compile_and_inspect(&self, name: &str, source: &str, marker: Option<&str>) -> Result<bool> {
        self.inspect_with(name, source, &[], |out| {
            marker.map_or(true, |m| out.stdout.contains(m))
        })
    }

    /// Whether the compiler takes `flag` without complaining about it.
    pub fn accepts_flag(&self, flag: &str) -> Result<bool> {
        let source = "int main(void) { return 0; }\n";
        self.inspect_with("flag", source, &[flag], |out| !out.stderr.contains(flag))
    }

    fn inspect_with(
        &self,
        name: &str,
        source: &str,
        extra: &[&str],
        accept: impl Fn(&CommandOutput) -> bool,
    ) -> Result<bool> {
        let scratch = scratch_dir()?;
        let src = write_source(&scratch, name, source)?;

        let cmd = ProcessBuilder::new(&self.cc)
            .args(&self.cflags)
            .args(extra)
            .args(["-S", "-o", "-", "-x", "c"])
            .arg(&src);
        self.log_invocation(name, source, &cmd);

        let out = self.runner.run(&cmd)?;
        if !out.success() {
            self.reporter.debug(&out.stderr);
            return Ok(false);
        }
        Ok(accept(&out))
    }

    fn compile(&self, name: &str, source: &str, cmd: &ProcessBuilder) -> Result<bool> {
        self.log_invocation(name, source, cmd);

        let out = self.runner.run(cmd)?;
        if !out.success() {
            self.reporter
                .debug(&format!("probe `{}` did not compile:\n{}", name, out.stderr));
        }
        Ok(out.success())
    }

    fn log_invocation(&self, name: &str, source: &str, cmd: &ProcessBuilder) {
        self.reporter
            .debug(&format!("probe `{}` source:\n{}", name, source));
        self.reporter.debug(&cmd.display_command());
    }
}

fn scratch_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("keelson-probe")
        .tempdir()
        .context("failed to create probe directory")
}

fn write_source(scratch: &TempDir, name: &str, source: &str) -> Result<PathBuf> {
    let path = scratch.path().join(format!("{}.c", name));
    std::fs::write(&path, source)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
