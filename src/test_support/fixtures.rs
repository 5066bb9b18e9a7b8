//! Test fixtures for toolkit trees and packages.

use std::fs::{self, File};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

/// Create `<root>/<profile>/bin/<locator>` as a packaged toolkit would.
pub fn make_toolkit_tree(root: &Path, profile: &str, locator: &str) {
    let bin = root.join(profile).join("bin");
    fs::create_dir_all(&bin).unwrap();
    fs::write(bin.join(locator), "#!/bin/sh\necho 2.8\n").unwrap();
    fs::create_dir_all(root.join("include/llvm")).unwrap();
}

/// Create a raw source checkout: the build descriptor, no build output.
pub fn make_foreign_tree(root: &Path) {
    fs::create_dir_all(root.join("lib/VMCore")).unwrap();
    fs::write(root.join("Makefile.common"), "LEVEL = .\n").unwrap();
}

/// Write a gzip tarball holding `entries` (path, contents).
///
/// Timestamps are zeroed so the same entries always produce the same bytes.
pub fn tarball<P: AsRef<Path>>(dest: &Path, entries: &[(P, &str)]) {
    let file = File::create(dest).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_mtime(0);
        builder
            .append_data(&mut header, path.as_ref(), contents.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tarball_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.tar.gz");
        let b = tmp.path().join("b.tar.gz");
        tarball(&a, &[("Release/bin/llvm-config", "x")]);
        tarball(&b, &[("Release/bin/llvm-config", "x")]);

        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    }
}
