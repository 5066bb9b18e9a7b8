//! The toolkit acquisition chain.
//!
//! Strategies run in a fixed order and the first one that produces a
//! usable toolkit wins:
//!
//! 1. **cached**: a tree already unpacked under the vendor directory
//! 2. **explicit-path**: a build tree the user pointed at
//! 3. **system**: a locator found on the search path
//! 4. **prebuilt**: a binary package for this host from a mirror
//! 5. **source**: the source archive
//! 6. **none**: build without the toolkit
//!
//! A strategy either accepts a candidate or rejects with a reason. An
//! `Err` aborts the whole run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::candidate::{CandidateKind, Incompatibility, ToolchainCandidate};
use crate::core::host::HostDescriptor;
use crate::core::version::ToolVersion;
use crate::ops::errors::ConfigureError;
use crate::sources::archive::{top_level_dir, Unpacker};
use crate::sources::fetch::{artifact_url, Fetch};
use crate::util::config::{Requirement, ToolkitConfig};
use crate::util::fs::{remove_dir_all_if_exists, remove_file_if_exists, rename_dir};
use crate::util::hash::checksum_record;
use crate::util::process::{find_executable, find_executable_in, CommandRunner};
use crate::util::reporter::Reporter;

/// Subdirectory whose presence marks a usable toolkit tree.
pub const LAYOUT_MARKER: &str = "Release";

/// File that marks a raw toolkit source checkout.
pub const FOREIGN_DESCRIPTOR: &str = "Makefile.common";

/// Build profiles an explicit toolkit path may contain.
pub const BUILD_PROFILES: &[&str] = &["Release", "Release+Asserts", "Debug", "Debug+Asserts"];

/// Outcome of one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Accepted(ToolchainCandidate),
    Rejected(String),
}

/// What is on disk at a tree location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeLayout {
    Missing,
    /// Unpacked from a package; has the layout marker.
    Valid,
    /// A source checkout that was never packaged.
    Foreign,
    /// Neither marker nor descriptor, e.g. an interrupted unpack.
    Incomplete,
}

pub fn inspect_tree(tree: &Path) -> TreeLayout {
    if !tree.is_dir() {
        TreeLayout::Missing
    } else if tree.join(LAYOUT_MARKER).is_dir() {
        TreeLayout::Valid
    } else if tree.join(FOREIGN_DESCRIPTOR).is_file() {
        TreeLayout::Foreign
    } else {
        TreeLayout::Incomplete
    }
}

/// What the locator reports about its toolkit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorReport {
    pub version: ToolVersion,
    pub rtti_enabled: bool,
}

type Strategy = fn(&Acquirer<'_>) -> Result<Attempt>;

const STRATEGIES: &[(CandidateKind, Strategy)] = &[
    (CandidateKind::Cached, cached),
    (CandidateKind::ExplicitPath, explicit_path),
    (CandidateKind::System, system),
    (CandidateKind::Prebuilt, prebuilt),
    (CandidateKind::Source, source),
    (CandidateKind::None, none),
];

/// Immutable inputs to the chain.
pub struct Acquirer<'a> {
    toolkit: &'a ToolkitConfig,
    host: &'a HostDescriptor,
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn Fetch,
    reporter: &'a dyn Reporter,
    distribution: Option<String>,
    unpacker: Unpacker,
    search_path: Option<OsString>,
}

impl<'a> Acquirer<'a> {
    pub fn new(
        toolkit: &'a ToolkitConfig,
        host: &'a HostDescriptor,
        runner: &'a dyn CommandRunner,
        fetcher: &'a dyn Fetch,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Acquirer {
            toolkit,
            host,
            runner,
            fetcher,
            reporter,
            distribution: None,
            unpacker: Unpacker::default(),
            search_path: None,
        }
    }

    /// Distribution label used for distribution-specific package names.
    pub fn with_distribution(mut self, distribution: Option<String>) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_unpacker(mut self, unpacker: Unpacker) -> Self {
        self.unpacker = unpacker;
        self
    }

    /// Search this path for the locator instead of PATH.
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Walk the strategies until one accepts.
    pub fn acquire(&self) -> Result<ToolchainCandidate> {
        if self.toolkit.requirement == Requirement::Disabled {
            self.reporter
                .info(&format!("{} disabled; not looking for it", self.toolkit.name));
            return Ok(ToolchainCandidate::none());
        }

        for (kind, strategy) in STRATEGIES {
            match strategy(self)? {
                Attempt::Accepted(candidate) => {
                    if candidate.is_enabled() {
                        self.reporter.info(&format!(
                            "using {} {} ({})",
                            kind,
                            self.toolkit.name,
                            candidate
                                .locator_path
                                .as_deref()
                                .map(|p| p.display().to_string())
                                .unwrap_or_default()
                        ));
                    }
                    return Ok(candidate);
                }
                Attempt::Rejected(reason) => {
                    self.reporter.debug(&format!("{}: {}", kind, reason));
                }
            }
        }

        Ok(ToolchainCandidate::none())
    }

    /// `<vendor_dir>/<tree_name>`.
    pub fn tree_path(&self) -> PathBuf {
        self.toolkit.vendor_dir.join(&self.toolkit.tree_name)
    }

    fn locator_name(&self) -> String {
        self.host.exe_name(&self.toolkit.locator)
    }

    /// API identifier of the configured toolkit version.
    fn packaged_api_version(&self) -> Option<u32> {
        ToolVersion::parse(&self.toolkit.version).api_version()
    }

    fn tree_candidate(&self, kind: CandidateKind, tree: &Path) -> ToolchainCandidate {
        let locator = tree
            .join(LAYOUT_MARKER)
            .join("bin")
            .join(self.locator_name());
        ToolchainCandidate::new(kind, locator)
            .with_tree(tree)
            .with_api_version(self.packaged_api_version())
    }

    /// Ask a locator for its version and compile flags.
    pub fn query_locator(&self, locator: &Path) -> Result<LocatorReport> {
        let version = self
            .runner
            .run(&self.runner.script(locator).arg("--version"))?;
        if !version.success() {
            bail!(
                "`{} --version` failed: {}",
                locator.display(),
                version.stderr.trim()
            );
        }

        let cxxflags = self
            .runner
            .run(&self.runner.script(locator).arg("--cxxflags"))?;
        if !cxxflags.success() {
            bail!(
                "`{} --cxxflags` failed: {}",
                locator.display(),
                cxxflags.stderr.trim()
            );
        }

        Ok(LocatorReport {
            version: ToolVersion::parse(version.first_line().unwrap_or_default()),
            rtti_enabled: !cxxflags.stdout.contains("-fno-rtti"),
        })
    }

    fn describe(&self, kind: CandidateKind, locator: &Path) -> Result<(ToolchainCandidate, Option<Incompatibility>)> {
        let report = self.query_locator(locator)?;
        let candidate = ToolchainCandidate::new(kind, locator)
            .with_api_version(report.version.api_version())
            .with_rtti(report.rtti_enabled);
        let problem = candidate
            .check_compatibility(&self.toolkit.supported_api_versions)
            .err();
        Ok((candidate, problem))
    }

    /// Package file names to try, most specific first.
    pub fn prebuilt_names(&self) -> Vec<String> {
        let ext = &self.toolkit.archive_extension;
        let with_ext = |stem: String| format!("{}.{}", stem, ext);

        let mut names = Vec::new();
        if let Some(name) = &self.toolkit.prebuilt_name {
            if name.ends_with(&format!(".{}", ext)) {
                names.push(name.clone());
            } else {
                names.push(with_ext(name.clone()));
            }
        }

        if self.host.is_degenerate() {
            return names;
        }

        let prefix = format!("{}-{}", self.toolkit.name, self.toolkit.version);
        let triple = self.host.triple();

        if let Some(distro) = &self.distribution {
            names.push(with_ext(format!("{}-{}-{}", prefix, triple, distro)));
        }
        names.push(with_ext(format!("{}-{}", prefix, triple)));

        if self.host.is_darwin {
            if let Some(major) = self.host.os_major_version() {
                names.push(with_ext(format!(
                    "{}-{}-{}-darwin{}",
                    prefix, self.host.cpu, self.host.vendor, major
                )));
            }
        }

        names
    }

    /// Try every mirror until `file_name` lands at `dest`.
    fn fetch_from_mirrors(&self, file_name: &str, dest: &Path) -> bool {
        for mirror in &self.toolkit.prebuilt_mirrors {
            match artifact_url(mirror, file_name) {
                Ok(url) => {
                    if self.fetcher.fetch(&url, dest, self.reporter) {
                        return true;
                    }
                }
                Err(e) => self.reporter.warn(&format!("{:#}", e)),
            }
        }
        false
    }

    /// Fetch, verify and unpack one prebuilt package.
    fn try_prebuilt(&self, file_name: &str) -> Result<Option<ToolchainCandidate>> {
        let cache = &self.toolkit.package_cache;
        let archive = cache.join(file_name);
        let digest_name = format!("{}.md5", file_name);
        let digest = cache.join(&digest_name);

        if self.toolkit.update_prebuilt {
            remove_file_if_exists(&archive)?;
            remove_file_if_exists(&digest)?;
        }

        if archive.is_file() {
            self.reporter
                .debug(&format!("using cached package {}", archive.display()));
        } else if !self.fetch_from_mirrors(file_name, &archive) {
            self.reporter
                .debug(&format!("no prebuilt package {}", file_name));
            return Ok(None);
        }

        if !digest.is_file() {
            self.fetch_from_mirrors(&digest_name, &digest);
        }

        if digest.is_file() {
            let verified = match checksum_record(&digest, &archive) {
                Ok(record) if record.matches() => true,
                Ok(record) => {
                    self.reporter.error(&format!(
                        "checksum mismatch for {}: expected {}, got {}",
                        file_name, record.expected, record.actual
                    ));
                    false
                }
                Err(e) => {
                    self.reporter
                        .error(&format!("cannot verify {}: {:#}", file_name, e));
                    false
                }
            };
            if !verified {
                remove_file_if_exists(&archive)?;
                remove_file_if_exists(&digest)?;
                return Ok(None);
            }
        } else {
            self.reporter.warn(&format!(
                "no checksum published for {}; using it unverified",
                file_name
            ));
        }

        let tree = self.tree_path();
        remove_dir_all_if_exists(&tree)?;
        if let Err(e) = self.unpacker.unpack(self.runner, &archive, &tree) {
            self.reporter
                .warn(&format!("could not unpack {}: {:#}", file_name, e));
            remove_dir_all_if_exists(&tree)?;
            return Ok(None);
        }

        if inspect_tree(&tree) == TreeLayout::Valid {
            Ok(Some(self.tree_candidate(CandidateKind::Prebuilt, &tree)))
        } else {
            self.reporter.warn(&format!(
                "{} does not contain a {} build",
                file_name, LAYOUT_MARKER
            ));
            remove_dir_all_if_exists(&tree)?;
            Ok(None)
        }
    }

    fn try_source(&self, url: &str) -> Result<Attempt> {
        let url = url::Url::parse(url).with_context(|| format!("invalid source URL `{}`", url))?;
        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .with_context(|| format!("source URL {} has no file name", url))?;

        let archive = self.toolkit.package_cache.join(&file_name);
        if !archive.is_file() && !self.fetcher.fetch(&url, &archive, self.reporter) {
            return Ok(Attempt::Rejected(format!("could not download {}", url)));
        }

        let staging = self
            .toolkit
            .vendor_dir
            .join(format!(".{}-unpack", self.toolkit.tree_name));
        remove_dir_all_if_exists(&staging)?;

        let unpacked = self
            .unpacker
            .unpack(self.runner, &archive, &staging)
            .and_then(|()| top_level_dir(&staging));
        let top = match unpacked {
            Ok(top) => top,
            Err(e) => {
                remove_dir_all_if_exists(&staging)?;
                remove_file_if_exists(&archive)?;
                return Ok(Attempt::Rejected(format!("{}: {:#}", file_name, e)));
            }
        };

        let tree = self.tree_path();
        remove_dir_all_if_exists(&tree)?;
        rename_dir(&top, &tree)?;
        remove_dir_all_if_exists(&staging)?;

        if inspect_tree(&tree) == TreeLayout::Valid {
            Ok(Attempt::Accepted(
                self.tree_candidate(CandidateKind::Source, &tree),
            ))
        } else {
            remove_dir_all_if_exists(&tree)?;
            Ok(Attempt::Rejected(format!(
                "{} has no {} build",
                file_name, LAYOUT_MARKER
            )))
        }
    }
}

fn cached(acq: &Acquirer<'_>) -> Result<Attempt> {
    let tree = acq.tree_path();
    Ok(match inspect_tree(&tree) {
        TreeLayout::Valid => Attempt::Accepted(acq.tree_candidate(CandidateKind::Cached, &tree)),
        TreeLayout::Foreign => return Err(ConfigureError::ForeignTree { tree }.into()),
        TreeLayout::Incomplete => {
            acq.reporter.warn(&format!(
                "{} is incomplete; it will be replaced",
                tree.display()
            ));
            Attempt::Rejected("incomplete tree".to_string())
        }
        TreeLayout::Missing => Attempt::Rejected(format!("{} does not exist", tree.display())),
    })
}

fn explicit_path(acq: &Acquirer<'_>) -> Result<Attempt> {
    let Some(path) = &acq.toolkit.path else {
        return Ok(Attempt::Rejected("no toolkit path given".to_string()));
    };

    let locator_name = acq.locator_name();
    let Some(locator) = BUILD_PROFILES
        .iter()
        .map(|profile| path.join(profile).join("bin").join(&locator_name))
        .find(|candidate| candidate.is_file())
    else {
        return Err(ConfigureError::InvalidExplicitPath {
            path: path.clone(),
            locator: locator_name,
            profiles: BUILD_PROFILES.to_vec(),
        }
        .into());
    };

    let (candidate, problem) = acq
        .describe(CandidateKind::ExplicitPath, &locator)
        .with_context(|| format!("failed to query {}", locator.display()))?;
    if let Some(reason) = problem {
        return Err(ConfigureError::IncompatibleExplicitPath {
            path: path.clone(),
            reason,
        }
        .into());
    }

    Ok(Attempt::Accepted(candidate.with_tree(path)))
}

fn system(acq: &Acquirer<'_>) -> Result<Attempt> {
    let locator = match &acq.toolkit.locator_override {
        Some(path) if path.is_file() => path.clone(),
        Some(path) => {
            return Ok(Attempt::Rejected(format!(
                "{} does not exist",
                path.display()
            )))
        }
        None => {
            let found = match &acq.search_path {
                Some(search) => find_executable_in(&acq.toolkit.locator, search),
                None => find_executable(&acq.toolkit.locator),
            };
            match found {
                Some(path) => path,
                None => {
                    return Ok(Attempt::Rejected(format!(
                        "{} not found on the search path",
                        acq.toolkit.locator
                    )))
                }
            }
        }
    };

    let (candidate, problem) = match acq.describe(CandidateKind::System, &locator) {
        Ok(described) => described,
        Err(e) => return Ok(Attempt::Rejected(format!("{:#}", e))),
    };

    Ok(match problem {
        Some(reason) => {
            acq.reporter.info(&format!(
                "ignoring {}: {}",
                locator.display(),
                reason
            ));
            Attempt::Rejected(reason.to_string())
        }
        None => Attempt::Accepted(candidate),
    })
}

fn prebuilt(acq: &Acquirer<'_>) -> Result<Attempt> {
    let names = acq.prebuilt_names();
    if names.is_empty() {
        return Ok(Attempt::Rejected("unknown host; no package name".to_string()));
    }

    for name in &names {
        if let Some(candidate) = acq.try_prebuilt(name)? {
            return Ok(Attempt::Accepted(candidate));
        }
    }

    Ok(Attempt::Rejected(format!(
        "no prebuilt package for {}",
        acq.host
    )))
}

fn source(acq: &Acquirer<'_>) -> Result<Attempt> {
    match &acq.toolkit.source_url {
        Some(url) => acq.try_source(url),
        None => Ok(Attempt::Rejected("no source archive configured".to_string())),
    }
}

fn none(acq: &Acquirer<'_>) -> Result<Attempt> {
    if acq.toolkit.requirement == Requirement::Mandatory {
        return Err(ConfigureError::ToolkitRequired.into());
    }

    acq.reporter.warn(&format!(
        "no usable {} found; building without it (JIT disabled)",
        acq.toolkit.name
    ));
    Ok(Attempt::Accepted(ToolchainCandidate::none()))
}
