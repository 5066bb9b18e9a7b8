//! Host build tool detection and version gates.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::resolved::ToolInfo;
use crate::core::version::ToolVersion;
use crate::ops::errors::ConfigureError;
use crate::util::config::ToolsConfig;
use crate::util::process::{
    find_c_compiler, find_cxx_compiler, find_executable, find_executable_in, CommandRunner,
    ProcessBuilder,
};
use crate::util::reporter::Reporter;

/// The C compiler: configured, or the first one on PATH.
pub fn find_cc(tools: &ToolsConfig) -> Result<PathBuf> {
    match &tools.cc {
        Some(cc) => Ok(cc.clone()),
        None => find_c_compiler().ok_or_else(|| {
            ConfigureError::ToolMissing {
                tool: "C compiler".to_string(),
            }
            .into()
        }),
    }
}

fn find_cxx(tools: &ToolsConfig) -> Result<PathBuf> {
    match &tools.cxx {
        Some(cxx) => Ok(cxx.clone()),
        None => find_cxx_compiler().ok_or_else(|| {
            ConfigureError::ToolMissing {
                tool: "C++ compiler".to_string(),
            }
            .into()
        }),
    }
}

/// Version a tool prints for `arg`, from the first line of its output.
fn tool_version(runner: &dyn CommandRunner, tool: &Path, arg: &str) -> Result<Option<ToolVersion>> {
    let out = runner.run(&ProcessBuilder::new(tool).arg(arg))?;
    if !out.success() {
        return Ok(None);
    }
    Ok(out
        .first_line()
        .map(ToolVersion::parse)
        .filter(|v| !v.is_empty()))
}

fn gate(tool: &Path, found: ToolVersion, minimum: &str) -> Result<ToolVersion> {
    let minimum = ToolVersion::parse(minimum);
    if found.meets_minimum(&minimum) {
        Ok(found)
    } else {
        Err(ConfigureError::ToolTooOld {
            tool: tool.display().to_string(),
            found,
            minimum,
        }
        .into())
    }
}

/// Check the compilers and the parser generator.
///
/// `search_path` replaces PATH when looking up the parser generator.
pub fn detect_tools(
    tools: &ToolsConfig,
    cc: &Path,
    runner: &dyn CommandRunner,
    reporter: &dyn Reporter,
    search_path: Option<&OsStr>,
) -> Result<ToolInfo> {
    let cc_version = match tool_version(runner, cc, "-dumpversion")? {
        Some(version) => gate(cc, version, &tools.min_cc_version)?,
        None => {
            reporter.warn(&format!(
                "could not determine the version of {}; assuming it is new enough",
                cc.display()
            ));
            ToolVersion::default()
        }
    };
    reporter.info(&format!("using C compiler {} {}", cc.display(), cc_version));

    let cxx = find_cxx(tools)?;
    reporter.debug(&format!("using C++ compiler {}", cxx.display()));

    let parser = match search_path {
        Some(path) => find_executable_in(&tools.parser, path),
        None => find_executable(&tools.parser),
    };

    let (parser, parser_version) = match parser {
        Some(path) => {
            let version = match tool_version(runner, &path, "--version")? {
                Some(version) => gate(&path, version, &tools.min_parser_version)?,
                None => {
                    reporter.warn(&format!(
                        "could not determine the version of {}",
                        path.display()
                    ));
                    ToolVersion::default()
                }
            };
            reporter.debug(&format!("using parser generator {} {}", path.display(), version));
            (Some(path), Some(version))
        }
        None => {
            reporter.warn(&format!(
                "{} not found; pregenerated parser sources will be used",
                tools.parser
            ));
            (None, None)
        }
    };

    Ok(ToolInfo {
        cc: cc.to_path_buf(),
        cxx,
        cc_version,
        parser,
        parser_version,
    })
}
