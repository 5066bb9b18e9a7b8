//! Host platform identity.
//!
//! The host is described by a `cpu-vendor-os` triple as reported by the
//! C compiler (`cc -dumpmachine`). Everything downstream (package names,
//! command wrapping, probe executables) keys off this descriptor.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::util::process::{CommandRunner, ProcessBuilder};
use crate::util::reporter::Reporter;

/// Platform identity derived from a host triple.
///
/// A triple with fewer than three fields produces the degenerate
/// descriptor: empty fields and every family flag cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostDescriptor {
    /// CPU architecture (x86_64, i686, powerpc, ...)
    pub cpu: String,
    /// Vendor field (unknown, apple, pc, ...)
    pub vendor: String,
    /// Everything after the vendor (linux-gnu, darwin10.8.0, mingw32, ...)
    pub os: String,
    pub is_windows: bool,
    pub is_darwin: bool,
    pub is_bsd: bool,
    pub is_linux: bool,
}

impl HostDescriptor {
    /// Parse a `cpu-vendor-os` triple.
    ///
    /// The first two hyphen-delimited fields are cpu and vendor; the
    /// remainder (which may itself contain hyphens) is the OS.
    pub fn parse(triple: &str) -> Self {
        let mut parts = triple.trim().splitn(3, '-');
        let (Some(cpu), Some(vendor), Some(os)) = (parts.next(), parts.next(), parts.next()) else {
            return HostDescriptor::default();
        };

        if cpu.is_empty() || vendor.is_empty() || os.is_empty() {
            return HostDescriptor::default();
        }

        HostDescriptor {
            cpu: cpu.to_string(),
            vendor: vendor.to_string(),
            os: os.to_string(),
            is_windows: os.contains("mingw") || os.contains("mswin"),
            is_darwin: os.contains("darwin"),
            is_bsd: os.contains("bsd"),
            is_linux: os.contains("linux"),
        }
    }

    /// Detect the host by asking the C compiler for its target machine.
    ///
    /// Falls back to [`HostDescriptor::from_build_target`] when the compiler
    /// cannot be run or does not understand `-dumpmachine`.
    pub fn detect(runner: &dyn CommandRunner, cc: &Path, reporter: &dyn Reporter) -> Self {
        match runner.run(&ProcessBuilder::new(cc).arg("-dumpmachine")) {
            Ok(out) if out.success() => {
                let triple = out.first_line().unwrap_or_default().to_string();
                let host = HostDescriptor::parse(&triple);
                if host.is_degenerate() {
                    reporter.debug(&format!(
                        "unusable host triple `{}` from {}",
                        triple,
                        cc.display()
                    ));
                    HostDescriptor::from_build_target()
                } else {
                    host
                }
            }
            Ok(out) => {
                reporter.debug(&format!(
                    "`{} -dumpmachine` failed: {}",
                    cc.display(),
                    out.stderr.trim()
                ));
                HostDescriptor::from_build_target()
            }
            Err(e) => {
                reporter.debug(&format!("could not run {}: {:#}", cc.display(), e));
                HostDescriptor::from_build_target()
            }
        }
    }

    /// Approximate the host triple from the platform this binary targets.
    pub fn from_build_target() -> Self {
        let cpu = std::env::consts::ARCH;
        let (vendor, os) = match std::env::consts::OS {
            "linux" => ("unknown", "linux-gnu"),
            "macos" => ("apple", "darwin"),
            "windows" => ("pc", "mingw32"),
            "freebsd" => ("unknown", "freebsd"),
            "openbsd" => ("unknown", "openbsd"),
            "netbsd" => ("unknown", "netbsd"),
            other => ("unknown", other),
        };

        HostDescriptor::parse(&format!("{}-{}-{}", cpu, vendor, os))
    }

    /// Whether parsing failed to produce any fields.
    pub fn is_degenerate(&self) -> bool {
        self.cpu.is_empty() && self.vendor.is_empty() && self.os.is_empty()
    }

    /// The triple as a string; empty for the degenerate descriptor.
    pub fn triple(&self) -> String {
        if self.is_degenerate() {
            String::new()
        } else {
            format!("{}-{}-{}", self.cpu, self.vendor, self.os)
        }
    }

    /// Leading number of the OS field (`darwin10.8.0` gives `10`).
    pub fn os_major_version(&self) -> Option<u32> {
        let start = self.os.find(|c: char| c.is_ascii_digit())?;
        let digits: String = self.os[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }

    /// Name of the executable produced from `stem` on this host.
    pub fn exe_name(&self, stem: &str) -> String {
        if self.is_windows {
            format!("{}.exe", stem)
        } else {
            stem.to_string()
        }
    }
}

impl fmt::Display for HostDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_degenerate() {
            write!(f, "<unknown host>")
        } else {
            write!(f, "{}", self.triple())
        }
    }
}

/// Detect the Linux distribution as a `name-version` label.
///
/// `root` is the filesystem root to read `etc/` from, so tests can point it
/// at a scratch directory. Release files are consulted in order:
/// `lsb-release`, `os-release`, `redhat-release`, `debian_version`.
pub fn detect_distribution(root: &Path) -> Option<String> {
    let etc = root.join("etc");

    if let Ok(contents) = std::fs::read_to_string(etc.join("lsb-release")) {
        let id = key_value(&contents, "DISTRIB_ID");
        let release = key_value(&contents, "DISTRIB_RELEASE");
        if let (Some(id), Some(release)) = (id, release) {
            return Some(label(&id, &release));
        }
    }

    if let Ok(contents) = std::fs::read_to_string(etc.join("os-release")) {
        let id = key_value(&contents, "ID");
        let version = key_value(&contents, "VERSION_ID");
        if let (Some(id), Some(version)) = (id, version) {
            return Some(label(&id, &version));
        }
    }

    if let Ok(contents) = std::fs::read_to_string(etc.join("redhat-release")) {
        // "CentOS release 5.5 (Final)"
        let line = contents.lines().next().unwrap_or_default();
        let name = line.split_whitespace().next();
        let version = line
            .split_whitespace()
            .find(|w| w.starts_with(|c: char| c.is_ascii_digit()));
        if let (Some(name), Some(version)) = (name, version) {
            return Some(label(name, version));
        }
    }

    if let Ok(contents) = std::fs::read_to_string(etc.join("debian_version")) {
        let version = contents.trim();
        if !version.is_empty() {
            return Some(label("debian", version));
        }
    }

    None
}

fn key_value(contents: &str, key: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        if k.trim() != key {
            return None;
        }
        let v = v.trim().trim_matches('"').trim_matches('\'');
        (!v.is_empty()).then(|| v.to_string())
    })
}

fn label(name: &str, version: &str) -> String {
    format!("{}-{}", name.to_lowercase(), version)
}
