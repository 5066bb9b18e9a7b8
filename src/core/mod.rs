//! Core data types for Keelson.
//!
//! This module contains the values a resolution run produces:
//! - Host identity (triple and platform family flags)
//! - Loose tool versions and their ordering
//! - Toolkit candidates and how they were obtained
//! - The frozen resolved configuration

pub mod candidate;
pub mod host;
pub mod resolved;
pub mod version;

pub use candidate::{CandidateKind, Incompatibility, ToolchainCandidate};
pub use host::{detect_distribution, HostDescriptor};
pub use resolved::{
    CapabilityFact, FactValue, ResolvedConfiguration, ResolvedConfigurationBuilder, ToolInfo,
};
pub use version::ToolVersion;
