//! Fatal configuration errors.
//!
//! Anything that should merely make a strategy or probe give up is not an
//! error; these are the conditions that abort the whole run.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::candidate::Incompatibility;
use crate::core::version::ToolVersion;

/// A condition that stops the run with a non-zero exit.
#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error(
        "{} holds a toolkit source tree that was not unpacked from a release package",
        tree.display()
    )]
    ForeignTree { tree: PathBuf },

    #[error(
        "{} is not a toolkit build tree (expected one of {} containing bin/{locator})",
        path.display(),
        profiles.join(", ")
    )]
    InvalidExplicitPath {
        path: PathBuf,
        locator: String,
        profiles: Vec<&'static str>,
    },

    #[error("toolkit at {} cannot be used: {reason}", path.display())]
    IncompatibleExplicitPath {
        path: PathBuf,
        reason: Incompatibility,
    },

    #[error("required probe `{name}` failed to compile")]
    ProbeFailed { name: String },

    #[error("{tool} {found} is too old (need {minimum} or newer)")]
    ToolTooOld {
        tool: String,
        found: ToolVersion,
        minimum: ToolVersion,
    },

    #[error("no usable {tool} found")]
    ToolMissing { tool: String },

    #[error("the toolkit is required but no acquisition strategy produced a usable copy")]
    ToolkitRequired,
}

impl ConfigureError {
    /// One-line suggestion printed under the error.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ConfigureError::ForeignTree { .. } => {
                Some("remove the directory or pass --toolkit-path to use a built tree")
            }
            ConfigureError::InvalidExplicitPath { .. } => {
                Some("point --toolkit-path at the root of a configured and built toolkit tree")
            }
            ConfigureError::IncompatibleExplicitPath { .. } => None,
            ConfigureError::ProbeFailed { .. } => {
                Some("check that the C compiler works; the probe source is in the run log")
            }
            ConfigureError::ToolTooOld { .. } => None,
            ConfigureError::ToolMissing { .. } => Some("set CC or tools.cc in keelson.toml"),
            ConfigureError::ToolkitRequired => {
                Some("pass --toolkit-path, or drop --require-toolkit to build without it")
            }
        }
    }
}
