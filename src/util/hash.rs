//! Hashing utilities for artifact checksums.
//!
//! Digest companions are plain text files named after the artifact with
//! an algorithm suffix (`llvm-2.8-x86_64-unknown-linux-gnu.tar.bz2.md5`)
//! holding `<hexdigest> <filename>`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::util::reporter::Reporter;

/// Digest algorithm of a companion file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// Pick the algorithm from a digest file's extension.
    pub fn from_digest_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "md5" => Some(DigestAlgorithm::Md5),
            "sha256" => Some(DigestAlgorithm::Sha256),
            _ => None,
        }
    }

    /// Hex digest of a file's contents.
    pub fn file_digest(&self, path: &Path) -> Result<String> {
        match self {
            DigestAlgorithm::Md5 => hash_file::<Md5>(path),
            DigestAlgorithm::Sha256 => hash_file::<Sha256>(path),
        }
    }
}

/// Compute MD5 hash of a file.
pub fn md5_file(path: &Path) -> Result<String> {
    hash_file::<Md5>(path)
}

fn hash_file<D: Digest>(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Expected and actual digest of one artifact. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRecord {
    pub expected: String,
    pub actual: String,
}

impl ChecksumRecord {
    /// Case-sensitive comparison.
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

/// First whitespace-delimited token of a digest file.
pub fn read_expected_digest(digest_file: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(digest_file)
        .with_context(|| format!("failed to read digest file: {}", digest_file.display()))?;

    contents
        .split_whitespace()
        .next()
        .map(str::to_string)
        .with_context(|| format!("digest file is empty: {}", digest_file.display()))
}

/// Build the checksum record for `artifact` against its companion.
pub fn checksum_record(digest_file: &Path, artifact: &Path) -> Result<ChecksumRecord> {
    let algorithm = DigestAlgorithm::from_digest_path(digest_file).with_context(|| {
        format!(
            "unknown digest algorithm for {} (expected .md5 or .sha256)",
            digest_file.display()
        )
    })?;

    Ok(ChecksumRecord {
        expected: read_expected_digest(digest_file)?,
        actual: algorithm.file_digest(artifact)?,
    })
}

/// Whether `artifact` matches the digest declared in `digest_file`.
///
/// Any problem reading either file counts as a mismatch.
pub fn verify_digest_file(digest_file: &Path, artifact: &Path, reporter: &dyn Reporter) -> bool {
    match checksum_record(digest_file, artifact) {
        Ok(record) => record.matches(),
        Err(e) => {
            reporter.debug(&format!("checksum verification failed: {:#}", e));
            false
        }
    }
}
