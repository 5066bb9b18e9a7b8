//! Unpacking downloaded packages.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

use crate::util::fs::ensure_dir;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Compression of a tarball, by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarBz2,
    TarXz,
    Tar,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(ArchiveFormat::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(ArchiveFormat::TarXz)
        } else if name.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }

    /// Flags handed to the archive tool.
    fn tool_flags(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "-xzf",
            ArchiveFormat::TarBz2 => "-xjf",
            ArchiveFormat::TarXz => "-xJf",
            ArchiveFormat::Tar => "-xf",
        }
    }
}

/// Unpacks gzip tarballs in-process and hands other formats to `tar`.
#[derive(Debug, Clone)]
pub struct Unpacker {
    tool: PathBuf,
}

impl Unpacker {
    /// `tool` is the archive program used for non-gzip formats.
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Unpacker { tool: tool.into() }
    }

    /// Unpack `archive` into `dest`, creating it if needed.
    pub fn unpack(&self, runner: &dyn CommandRunner, archive: &Path, dest: &Path) -> Result<()> {
        let Some(format) = ArchiveFormat::from_path(archive) else {
            bail!("unrecognized archive format: {}", archive.display());
        };

        ensure_dir(dest)?;

        match format {
            ArchiveFormat::TarGz => {
                let file = File::open(archive)
                    .with_context(|| format!("failed to open {}", archive.display()))?;
                Archive::new(GzDecoder::new(file))
                    .unpack(dest)
                    .with_context(|| format!("failed to unpack {}", archive.display()))
            }
            other => {
                let cmd = ProcessBuilder::new(&self.tool)
                    .arg(other.tool_flags())
                    .arg(archive)
                    .arg("-C")
                    .arg(dest);
                let output = runner.run(&cmd)?;
                if !output.success() {
                    bail!(
                        "`{}` failed: {}",
                        cmd.display_command(),
                        output.stderr.trim()
                    );
                }
                Ok(())
            }
        }
    }
}

impl Default for Unpacker {
    fn default() -> Self {
        Unpacker::new("tar")
    }
}

/// The single directory a source archive unpacked into.
///
/// Dotfiles next to it are ignored; anything else is an error.
pub fn top_level_dir(dir: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
    {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if !entry.file_type()?.is_dir() {
            bail!(
                "archive has a top-level file `{}`",
                entry.file_name().to_string_lossy()
            );
        }
        dirs.push(entry.path());
    }

    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        0 => bail!("archive unpacked to nothing in {}", dir.display()),
        n => bail!("archive has {} top-level directories", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tarball, MockRunner};
    use crate::util::process::CommandOutput;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_name() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("llvm-2.8.tgz")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("llvm-2.8-x86_64-unknown-linux-gnu.tar.bz2")),
            Some(ArchiveFormat::TarBz2)
        );
        assert_eq!(ArchiveFormat::from_path(Path::new("llvm-2.8.zip")), None);
    }

    #[test]
    fn test_gzip_unpacks_in_process() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("pkg.tar.gz");
        tarball(&archive, &[("llvm-2.8/Release/bin/llvm-config", "#!/bin/sh\n")]);

        let runner = MockRunner::new();
        let dest = tmp.path().join("out");
        Unpacker::default().unpack(&runner, &archive, &dest).unwrap();

        assert!(dest.join("llvm-2.8/Release/bin/llvm-config").is_file());
        assert!(runner.calls().is_empty());
        assert_eq!(top_level_dir(&dest).unwrap(), dest.join("llvm-2.8"));
    }

    #[test]
    fn test_bzip2_goes_through_tool() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("pkg.tar.bz2");
        std::fs::write(&archive, "not really bzip2").unwrap();
        let dest = tmp.path().join("out");

        let runner = MockRunner::new();
        runner.expect_prefix("gtar -xjf", CommandOutput::ok(""));
        Unpacker::new("gtar").unpack(&runner, &archive, &dest).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].ends_with(&format!("-C {}", dest.display())));
    }

    #[test]
    fn test_tool_failure_is_error() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("pkg.tar.xz");
        std::fs::write(&archive, "junk").unwrap();

        let runner = MockRunner::new();
        runner.expect_prefix("tar -xJf", CommandOutput::failed(2, "tar: not an archive"));
        let err = Unpacker::default()
            .unpack(&runner, &archive, &tmp.path().join("out"))
            .unwrap_err();
        assert!(err.to_string().contains("not an archive"));
    }

    #[test]
    fn test_top_level_dir_rejects_ambiguity() {
        let tmp = TempDir::new().unwrap();
        assert!(top_level_dir(tmp.path()).is_err());

        std::fs::create_dir(tmp.path().join("a")).unwrap();
        std::fs::create_dir(tmp.path().join("b")).unwrap();
        assert!(top_level_dir(tmp.path()).is_err());
    }
}
