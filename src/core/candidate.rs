//! Toolkit candidates produced by the acquisition chain.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// How the toolkit was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateKind {
    /// A previously unpacked tree in the vendor directory.
    Cached,
    /// A tree the user pointed at explicitly.
    ExplicitPath,
    /// An installation found through its locator on the search path.
    System,
    /// A prebuilt binary package matching the host.
    Prebuilt,
    /// A tree unpacked from the source archive.
    Source,
    /// Nothing usable; the toolkit is disabled.
    None,
}

impl CandidateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateKind::Cached => "cached",
            CandidateKind::ExplicitPath => "explicit-path",
            CandidateKind::System => "system",
            CandidateKind::Prebuilt => "prebuilt",
            CandidateKind::Source => "source",
            CandidateKind::None => "none",
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an otherwise discoverable toolkit cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Incompatibility {
    #[error("built without RTTI")]
    RttiDisabled,

    #[error("API version {} is not one of {}", display_api(.found), display_supported(.supported))]
    UnsupportedApi {
        found: Option<u32>,
        supported: Vec<u32>,
    },
}

fn display_api(api: &Option<u32>) -> String {
    api.map(|v| v.to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn display_supported(supported: &[u32]) -> String {
    supported
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A located copy of the toolkit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainCandidate {
    pub kind: CandidateKind,
    /// Path to the locator executable (`llvm-config`).
    pub locator_path: Option<PathBuf>,
    /// Root of the toolkit tree, when the candidate lives in one.
    pub tree: Option<PathBuf>,
    /// `major * 100 + minor` identifier.
    pub api_version: Option<u32>,
    pub rtti_enabled: bool,
}

impl ToolchainCandidate {
    pub fn new(kind: CandidateKind, locator_path: impl Into<PathBuf>) -> Self {
        ToolchainCandidate {
            kind,
            locator_path: Some(locator_path.into()),
            tree: None,
            api_version: None,
            rtti_enabled: true,
        }
    }

    /// The disabled marker.
    pub fn none() -> Self {
        ToolchainCandidate {
            kind: CandidateKind::None,
            locator_path: None,
            tree: None,
            api_version: None,
            rtti_enabled: false,
        }
    }

    pub fn with_tree(mut self, tree: impl AsRef<Path>) -> Self {
        self.tree = Some(tree.as_ref().to_path_buf());
        self
    }

    pub fn with_api_version(mut self, api_version: Option<u32>) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn with_rtti(mut self, enabled: bool) -> Self {
        self.rtti_enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.kind != CandidateKind::None
    }

    /// Check the candidate against the supported API identifiers.
    ///
    /// RTTI is checked first: a toolkit built without it can never link
    /// against the VM, whatever its version.
    pub fn check_compatibility(&self, supported: &[u32]) -> Result<(), Incompatibility> {
        if !self.rtti_enabled {
            return Err(Incompatibility::RttiDisabled);
        }

        match self.api_version {
            Some(api) if supported.contains(&api) => Ok(()),
            found => Err(Incompatibility::UnsupportedApi {
                found,
                supported: supported.to_vec(),
            }),
        }
    }
}
