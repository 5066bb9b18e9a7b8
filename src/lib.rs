//! Keelson - resolves a native toolkit and probes the host toolchain
//!
//! This crate provides the library behind the `keelson` binary: locating
//! or downloading the external toolkit, verifying what was downloaded,
//! and recording what the host C compiler can do.

pub mod core;
pub mod ops;
pub mod probe;
pub mod sources;
pub mod util;

/// Test utilities and mocks for Keelson unit tests.
///
/// This module is only available when running tests. It provides a
/// scripted command runner, an in-memory fetcher, a recording reporter
/// and fixtures for toolkit trees and tarballs.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{CandidateKind, HostDescriptor, ResolvedConfiguration, ToolchainCandidate};
pub use crate::ops::{ConfigureError, Pipeline};
pub use crate::util::config::Config;
